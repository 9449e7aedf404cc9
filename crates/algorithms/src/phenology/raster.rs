//! Tiled phenology extraction over a whole raster extent

use super::features::{FeatureField, PixelPhenology, PixelStatus, FEATURE_COUNT};
use super::params::PhenologyParams;
use super::pipeline::phenology_pixel;
use super::source::{MonthlyStack, TimeSeriesSource};
use ndarray::Array2;
use tracing::debug;
use verdant_core::raster::Raster;
use verdant_core::{Algorithm, Error, Result};
use verdant_parallel::{ProcessingMode, Tile, TiledProcessor};

/// How the extent is split and scheduled
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingOptions {
    /// Tile edge length in pixels (default: 512)
    pub tile_size: usize,
    /// Tiles in flight per batch; `None` uses twice the worker count
    pub batch_tiles: Option<usize>,
    /// Sequential or parallel execution
    pub mode: ProcessingMode,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            tile_size: 512,
            batch_tiles: None,
            mode: ProcessingMode::Parallel,
        }
    }
}

impl ProcessingOptions {
    fn processor(&self) -> Result<TiledProcessor> {
        TiledProcessor::new(self.tile_size, self.batch_tiles, self.mode)
    }
}

/// Pixel counts by outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub season: usize,
    pub empty_season: usize,
    pub no_data: usize,
}

impl RunSummary {
    fn record(&mut self, px: &PixelPhenology) {
        match px.status() {
            PixelStatus::Season => self.season += 1,
            PixelStatus::EmptySeason => self.empty_season += 1,
            PixelStatus::NoData => self.no_data += 1,
        }
    }

    /// Total pixels counted
    pub fn total(&self) -> usize {
        self.season + self.empty_season + self.no_data
    }
}

/// The fourteen phenology bands of a raster extent.
///
/// Bands share the source geotransform and use NaN as no-data; pixels whose
/// twelve months were all missing are NaN in every band, so they cannot be
/// mistaken for pixels with an empty season (which read as zeros).
#[derive(Debug, Clone)]
pub struct PhenologyBands {
    bands: Vec<Raster<f64>>,
    summary: RunSummary,
}

impl PhenologyBands {
    /// NaN-filled bands matching the extent and grid of `source`
    pub fn for_source(source: &dyn TimeSeriesSource) -> Self {
        let (rows, cols) = source.shape();
        let transform = source.transform();
        let bands = (0..FEATURE_COUNT)
            .map(|_| {
                let mut band = Raster::filled(rows, cols, f64::NAN);
                band.set_transform(transform);
                band.set_nodata(Some(f64::NAN));
                band
            })
            .collect();

        Self {
            bands,
            summary: RunSummary::default(),
        }
    }

    /// Store one tile of results, as delivered by [`phenology_tiles`]
    pub fn write_tile(&mut self, tile: &Tile, pixels: &[PixelPhenology]) -> Result<()> {
        if pixels.len() != tile.len() {
            return Err(Error::Other(format!(
                "{} results for a tile of {} pixels",
                pixels.len(),
                tile.len()
            )));
        }

        for px in pixels {
            self.summary.record(px);
        }

        for field in FeatureField::ALL {
            let values = Array2::from_shape_fn((tile.rows, tile.cols), |(r, c)| {
                match pixels[r * tile.cols + c] {
                    PixelPhenology::NoData => f64::NAN,
                    PixelPhenology::Computed(fv) => fv.get(field),
                }
            });
            self.bands[field.index()].paste(tile.row_offset, tile.col_offset, values.view())?;
        }
        Ok(())
    }

    /// Band for one field
    pub fn band(&self, field: FeatureField) -> &Raster<f64> {
        &self.bands[field.index()]
    }

    /// `(field, band)` pairs in contract order
    pub fn iter(&self) -> impl Iterator<Item = (FeatureField, &Raster<f64>)> {
        FeatureField::ALL.into_iter().zip(self.bands.iter())
    }

    /// Pixel counts by outcome
    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    /// Extent as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.bands[0].shape()
    }

    /// Consume into `(field, band)` pairs in contract order
    pub fn into_bands(self) -> Vec<(FeatureField, Raster<f64>)> {
        FeatureField::ALL.into_iter().zip(self.bands).collect()
    }
}

fn tile_phenology(
    source: &dyn TimeSeriesSource,
    params: &PhenologyParams,
    tile: &Tile,
) -> Result<Vec<PixelPhenology>> {
    let series = source.read_tile(tile)?;
    if series.len() != tile.len() {
        return Err(Error::Other(format!(
            "source returned {} series for a tile of {} pixels",
            series.len(),
            tile.len()
        )));
    }
    Ok(series.iter().map(|s| phenology_pixel(s, params)).collect())
}

/// Stream per-tile phenology results to `sink`.
///
/// Only the tiles of the current batch are held in memory. The sink receives
/// tiles in row-major order with one result per pixel, row-major within the
/// tile. The first failing tile (source error or sink error) aborts the run.
pub fn phenology_tiles<S>(
    source: &dyn TimeSeriesSource,
    params: &PhenologyParams,
    options: &ProcessingOptions,
    sink: S,
) -> Result<()>
where
    S: FnMut(Tile, Vec<PixelPhenology>) -> Result<()>,
{
    params.validate()?;
    let processor = options.processor()?;
    let (rows, cols) = source.shape();

    debug!(label = %params.label(), rows, cols, "phenology run");
    processor.run(rows, cols, |tile| tile_phenology(source, params, tile), sink)
}

/// Compute the fourteen phenology bands of `source`.
///
/// Results do not depend on the tile size, batch size or execution mode.
pub fn phenology_raster(
    source: &dyn TimeSeriesSource,
    params: &PhenologyParams,
    options: &ProcessingOptions,
) -> Result<PhenologyBands> {
    let mut bands = PhenologyBands::for_source(source);

    phenology_tiles(source, params, options, |tile, pixels| {
        bands.write_tile(&tile, &pixels)
    })?;

    let summary = bands.summary();
    debug!(
        label = %params.label(),
        season = summary.season,
        empty_season = summary.empty_season,
        no_data = summary.no_data,
        "phenology bands computed"
    );
    Ok(bands)
}

/// Phenology extraction as an [`Algorithm`] over a monthly stack
#[derive(Debug, Clone, Default)]
pub struct Phenology {
    pub options: ProcessingOptions,
}

impl Algorithm for Phenology {
    type Input = MonthlyStack;
    type Output = PhenologyBands;
    type Params = PhenologyParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Phenology"
    }

    fn description(&self) -> &'static str {
        "Derive growing-season timing, amplitude, cumulative activity and rate extremes from twelve monthly index composites"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        phenology_raster(&input, &params, &self.options)
    }
}
