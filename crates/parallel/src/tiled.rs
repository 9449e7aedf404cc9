//! Tiled processing for large rasters
//!
//! Per-pixel work needs no neighbourhood, so tiles never overlap: every
//! cell belongs to exactly one tile and results can be written back by
//! offset alone.

use crate::strategy::{Executor, ParallelStrategy, ProcessingMode};
use tracing::{debug, trace};
use verdant_core::{Error, Result};

/// A rectangular window of a raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Row offset in the source raster
    pub row_offset: usize,
    /// Column offset in the source raster
    pub col_offset: usize,
    /// Number of rows in this tile
    pub rows: usize,
    /// Number of columns in this tile
    pub cols: usize,
}

impl Tile {
    /// Create a new tile
    pub fn new(row_offset: usize, col_offset: usize, rows: usize, cols: usize) -> Self {
        Self {
            row_offset,
            col_offset,
            rows,
            cols,
        }
    }

    /// Number of cells in the tile
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    /// Whether the tile covers no cells
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert tile-local coordinates to source raster coordinates
    pub fn to_source_coords(&self, local_row: usize, local_col: usize) -> (usize, usize) {
        (self.row_offset + local_row, self.col_offset + local_col)
    }

    /// Source coordinates of every cell, row-major
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.rows).flat_map(move |r| (0..self.cols).map(move |c| self.to_source_coords(r, c)))
    }
}

/// Iterator over non-overlapping tiles covering a raster, row-major
#[derive(Debug, Clone)]
pub struct TileIterator {
    total_rows: usize,
    total_cols: usize,
    tile_size: usize,
    current_row: usize,
    current_col: usize,
}

impl TileIterator {
    /// Create a new tile iterator. A `tile_size` of zero is treated as one.
    pub fn new(total_rows: usize, total_cols: usize, tile_size: usize) -> Self {
        Self {
            total_rows,
            total_cols,
            tile_size: tile_size.max(1),
            current_row: 0,
            current_col: 0,
        }
    }
}

impl Iterator for TileIterator {
    type Item = Tile;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_row >= self.total_rows || self.total_cols == 0 {
            return None;
        }

        let rows = self.tile_size.min(self.total_rows - self.current_row);
        let cols = self.tile_size.min(self.total_cols - self.current_col);
        let tile = Tile::new(self.current_row, self.current_col, rows, cols);

        self.current_col += self.tile_size;
        if self.current_col >= self.total_cols {
            self.current_col = 0;
            self.current_row += self.tile_size;
        }

        Some(tile)
    }
}

/// Runs per-tile work with a bounded number of tiles in flight.
///
/// Tiles are processed in batches of `batch_tiles`; each batch runs under the
/// configured [`ProcessingMode`] and its results are handed to the sink in
/// tile order before the next batch starts.
#[derive(Debug, Clone)]
pub struct TiledProcessor {
    tile_size: usize,
    batch_tiles: usize,
    mode: ProcessingMode,
}

impl TiledProcessor {
    /// Create a processor; `batch_tiles` defaults to twice the worker count.
    pub fn new(tile_size: usize, batch_tiles: Option<usize>, mode: ProcessingMode) -> Result<Self> {
        if tile_size == 0 {
            return Err(Error::InvalidParameter {
                name: "tile_size",
                value: tile_size.to_string(),
                reason: "tiles must contain at least one row and column".to_string(),
            });
        }
        if batch_tiles == Some(0) {
            return Err(Error::InvalidParameter {
                name: "batch_tiles",
                value: "0".to_string(),
                reason: "at least one tile must be in flight".to_string(),
            });
        }
        mode.validate()?;

        Ok(Self {
            tile_size,
            batch_tiles: batch_tiles.unwrap_or_else(|| 2 * mode.workers().max(1)),
            mode,
        })
    }

    /// Tile edge length in cells
    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    /// Tiles processed per batch
    pub fn batch_tiles(&self) -> usize {
        self.batch_tiles
    }

    /// Execution mode
    pub fn mode(&self) -> ProcessingMode {
        self.mode
    }

    /// Tiles covering a `rows x cols` extent
    pub fn tiles(&self, rows: usize, cols: usize) -> TileIterator {
        TileIterator::new(rows, cols, self.tile_size)
    }

    /// Run `work` on every tile of a `rows x cols` extent and feed the results to `sink`.
    ///
    /// A failing tile aborts the run; its error is wrapped with the tile origin.
    /// The sink sees tiles in row-major order regardless of the execution mode.
    /// Every batch of a run shares one set of worker threads.
    pub fn run<T, W, S>(&self, rows: usize, cols: usize, work: W, mut sink: S) -> Result<()>
    where
        T: Send,
        W: Fn(&Tile) -> Result<T> + Sync + Send,
        S: FnMut(Tile, T) -> Result<()>,
    {
        let executor = Executor::new(self.mode)?;
        let mut tiles = self.tiles(rows, cols).peekable();
        let mut batch_index = 0usize;

        debug!(
            rows,
            cols,
            tile_size = self.tile_size,
            batch_tiles = self.batch_tiles,
            mode = ?self.mode,
            "starting tiled run"
        );

        while tiles.peek().is_some() {
            let batch: Vec<Tile> = tiles.by_ref().take(self.batch_tiles).collect();
            trace!(batch = batch_index, tiles = batch.len(), "processing batch");

            let results = executor.try_map(batch, |tile| {
                work(&tile)
                    .map(|out| (tile, out))
                    .map_err(|e| e.in_tile(tile.row_offset, tile.col_offset))
            })?;

            for (tile, out) in results {
                sink(tile, out)?;
            }
            batch_index += 1;
        }

        debug!(batches = batch_index, "tiled run finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_iterator() {
        let tiles: Vec<_> = TileIterator::new(100, 70, 32).collect();
        assert_eq!(tiles.len(), 4 * 3);
        assert_eq!(tiles[0], Tile::new(0, 0, 32, 32));
        assert_eq!(tiles[2], Tile::new(0, 64, 32, 6));
        assert_eq!(tiles[11], Tile::new(96, 64, 4, 6));
    }

    #[test]
    fn test_tile_coverage_is_exact() {
        let rows = 45;
        let cols = 38;
        let mut hits = vec![vec![0u8; cols]; rows];

        for tile in TileIterator::new(rows, cols, 16) {
            for (r, c) in tile.cells() {
                hits[r][c] += 1;
            }
        }

        for r in 0..rows {
            for c in 0..cols {
                assert_eq!(hits[r][c], 1, "Cell ({}, {}) covered {} times", r, c, hits[r][c]);
            }
        }
    }

    #[test]
    fn test_empty_extent() {
        assert_eq!(TileIterator::new(0, 10, 4).count(), 0);
        assert_eq!(TileIterator::new(10, 0, 4).count(), 0);
    }

    #[test]
    fn test_run_feeds_sink_in_order() {
        let processor = TiledProcessor::new(8, Some(3), ProcessingMode::Parallel).unwrap();
        let mut seen = Vec::new();
        processor
            .run(
                20,
                20,
                |tile| Ok(tile.len()),
                |tile, n| {
                    seen.push((tile.row_offset, tile.col_offset, n));
                    Ok(())
                },
            )
            .unwrap();

        let expected: Vec<_> = TileIterator::new(20, 20, 8)
            .map(|t| (t.row_offset, t.col_offset, t.len()))
            .collect();
        assert_eq!(seen, expected);
        assert_eq!(seen.iter().map(|s| s.2).sum::<usize>(), 400);
    }

    #[test]
    fn test_run_reports_failing_tile() {
        let processor = TiledProcessor::new(10, None, ProcessingMode::Sequential).unwrap();
        let err = processor
            .run(
                30,
                30,
                |tile| {
                    if tile.row_offset == 10 && tile.col_offset == 20 {
                        Err(Error::Other("source unavailable".into()))
                    } else {
                        Ok(())
                    }
                },
                |_, _| Ok(()),
            )
            .unwrap_err();

        assert!(matches!(err, Error::Tile { row: 10, col: 20, .. }));
    }

    #[test]
    fn test_dedicated_pool_is_shared_across_batches() {
        use std::collections::HashSet;
        use std::sync::Mutex;

        let processor = TiledProcessor::new(4, Some(2), ProcessingMode::ParallelWith(2)).unwrap();
        let threads = Mutex::new(HashSet::new());
        let mut delivered = 0;
        processor
            .run(
                16,
                16,
                |_| {
                    assert_eq!(rayon::current_num_threads(), 2);
                    threads.lock().unwrap().insert(std::thread::current().id());
                    Ok(())
                },
                |_, _| {
                    delivered += 1;
                    Ok(())
                },
            )
            .unwrap();

        assert_eq!(delivered, 16);
        let distinct = threads.lock().unwrap().len();
        assert!(distinct <= 2, "{} worker threads for a two-thread pool", distinct);
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(TiledProcessor::new(0, None, ProcessingMode::Parallel).is_err());
        assert!(TiledProcessor::new(64, Some(0), ProcessingMode::Parallel).is_err());
        assert!(TiledProcessor::new(64, None, ProcessingMode::ParallelWith(0)).is_err());
    }
}
