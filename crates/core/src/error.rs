//! Error types for Verdant

use thiserror::Error;

/// Main error type for Verdant operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Raster grid mismatch: band {band} is not aligned with band 1")]
    GridMismatch { band: usize },

    #[error("Expected {expected} monthly observations, got {actual}")]
    MonthCount { expected: usize, actual: usize },

    #[error("Band already present in feature stack: {0}")]
    DuplicateBand(String),

    #[error("Unknown band: {0}")]
    UnknownBand(String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Tile at ({row}, {col}) failed: {source}")]
    Tile {
        row: usize,
        col: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap an error raised while reading or processing the tile at `(row, col)`.
    pub fn in_tile(self, row: usize, col: usize) -> Self {
        match self {
            // keep the innermost tile location
            e @ Error::Tile { .. } => e,
            e => Error::Tile {
                row,
                col,
                source: Box::new(e),
            },
        }
    }
}

/// Result type alias for Verdant operations
pub type Result<T> = std::result::Result<T, Error>;
