//! Providers of per-pixel monthly series
//!
//! The phenology driver pulls series one tile at a time, so a source only
//! has to materialise the pixels of the tiles currently in flight.

use super::series::{MonthlySeries, MONTHS};
use ndarray::ArrayView2;
use std::path::Path;
use verdant_core::io::GeoTiffReader;
use verdant_core::raster::{GeoTransform, Raster, RasterElement};
use verdant_core::{Error, Result};
use verdant_parallel::Tile;

/// Supplies the monthly series of every pixel of a raster extent.
pub trait TimeSeriesSource: Sync {
    /// Extent as (rows, cols)
    fn shape(&self) -> (usize, usize);

    /// Georeferencing carried onto the output bands
    fn transform(&self) -> GeoTransform {
        GeoTransform::default()
    }

    /// Series for every cell of `tile`, row-major.
    ///
    /// Errors are reported as a failure of the whole tile.
    fn read_tile(&self, tile: &Tile) -> Result<Vec<MonthlySeries>>;
}

/// Twelve co-registered monthly index rasters, January first.
///
/// Each month honours its own no-data value; NaN is always missing.
#[derive(Debug, Clone)]
pub struct MonthlyStack {
    months: Vec<Raster<f64>>,
}

impl MonthlyStack {
    /// Build a stack, checking count, shape and grid alignment.
    pub fn new(months: Vec<Raster<f64>>) -> Result<Self> {
        check_month_grids(months.iter().map(|band| (band.shape(), band.transform())))?;
        Ok(Self { months })
    }

    /// Raster for `month` (1-based)
    pub fn month(&self, month: u8) -> Option<&Raster<f64>> {
        (month as usize).checked_sub(1).and_then(|i| self.months.get(i))
    }

    /// Series of a single pixel
    pub fn series_at(&self, row: usize, col: usize) -> Result<MonthlySeries> {
        let mut values = [None; MONTHS];
        for (slot, band) in values.iter_mut().zip(&self.months) {
            let v = band.get(row, col)?;
            if !band.is_nodata(v) {
                *slot = Some(v);
            }
        }
        Ok(MonthlySeries::from_options(values))
    }
}

impl TimeSeriesSource for MonthlyStack {
    fn shape(&self) -> (usize, usize) {
        self.months[0].shape()
    }

    fn transform(&self) -> GeoTransform {
        *self.months[0].transform()
    }

    fn read_tile(&self, tile: &Tile) -> Result<Vec<MonthlySeries>> {
        let windows = self
            .months
            .iter()
            .map(|band| {
                band.window(tile.row_offset, tile.col_offset, tile.rows, tile.cols)
                    .map(|w| (w, band.nodata()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(series_from_windows(tile, &windows))
    }
}

/// Twelve monthly GeoTIFFs, January first, read from disk one tile at a time.
///
/// Only the strips or tiles of the files that overlap the requested window
/// are decoded, so memory stays bounded by the tiles in flight rather than
/// by the scene size.
#[derive(Debug, Clone)]
pub struct GeoTiffStack {
    months: Vec<GeoTiffReader>,
}

impl GeoTiffStack {
    /// Open the monthly files, checking count, shape and grid alignment.
    pub fn open<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        if paths.len() != MONTHS {
            return Err(Error::MonthCount {
                expected: MONTHS,
                actual: paths.len(),
            });
        }

        let months = paths
            .iter()
            .map(GeoTiffReader::open)
            .collect::<Result<Vec<_>>>()?;
        check_month_grids(months.iter().map(|m| (m.shape(), m.transform())))?;
        Ok(Self { months })
    }

    /// Use `nodata` for every month instead of the files' own tags.
    /// `None` keeps the tags.
    pub fn with_nodata(mut self, nodata: Option<f64>) -> Self {
        if nodata.is_some() {
            for month in &mut self.months {
                month.set_nodata(nodata);
            }
        }
        self
    }

    /// Reader for `month` (1-based)
    pub fn month(&self, month: u8) -> Option<&GeoTiffReader> {
        (month as usize).checked_sub(1).and_then(|i| self.months.get(i))
    }
}

impl TimeSeriesSource for GeoTiffStack {
    fn shape(&self) -> (usize, usize) {
        self.months[0].shape()
    }

    fn transform(&self) -> GeoTransform {
        *self.months[0].transform()
    }

    fn read_tile(&self, tile: &Tile) -> Result<Vec<MonthlySeries>> {
        let windows = self
            .months
            .iter()
            .map(|month| {
                month
                    .read_window::<f64>(tile.row_offset, tile.col_offset, tile.rows, tile.cols)
                    .map(|w| (w, month.nodata()))
            })
            .collect::<Result<Vec<_>>>()?;
        let views: Vec<_> = windows.iter().map(|(w, nd)| (w.view(), *nd)).collect();

        Ok(series_from_windows(tile, &views))
    }
}

fn check_month_grids<'a, I>(grids: I) -> Result<()>
where
    I: Iterator<Item = ((usize, usize), &'a GeoTransform)>,
{
    let grids: Vec<_> = grids.collect();
    if grids.len() != MONTHS {
        return Err(Error::MonthCount {
            expected: MONTHS,
            actual: grids.len(),
        });
    }

    let (first_shape, first_gt) = grids[0];
    for (i, &(shape, gt)) in grids.iter().enumerate().skip(1) {
        if shape != first_shape {
            return Err(Error::SizeMismatch {
                er: first_shape.0,
                ec: first_shape.1,
                ar: shape.0,
                ac: shape.1,
            });
        }
        if !gt.is_aligned_with(first_gt) {
            return Err(Error::GridMismatch { band: i + 1 });
        }
    }
    Ok(())
}

/// Row-major series of a tile from one window per month
fn series_from_windows(tile: &Tile, windows: &[(ArrayView2<'_, f64>, Option<f64>)]) -> Vec<MonthlySeries> {
    let mut out = Vec::with_capacity(tile.len());
    for r in 0..tile.rows {
        for c in 0..tile.cols {
            let mut values = [None; MONTHS];
            for (slot, (window, nodata)) in values.iter_mut().zip(windows) {
                let v = window[(r, c)];
                if !v.is_nodata(*nodata) {
                    *slot = Some(v);
                }
            }
            out.push(MonthlySeries::from_options(values));
        }
    }
    out
}

/// A source backed by a closure `(row, col) -> series`.
///
/// Suitable for series computed on the fly or fetched lazily; the closure
/// is called once per pixel from worker threads.
pub struct SeriesFn<F> {
    rows: usize,
    cols: usize,
    transform: GeoTransform,
    f: F,
}

impl<F> SeriesFn<F>
where
    F: Fn(usize, usize) -> Result<MonthlySeries> + Sync,
{
    pub fn new(rows: usize, cols: usize, f: F) -> Self {
        Self {
            rows,
            cols,
            transform: GeoTransform::default(),
            f,
        }
    }

    /// Attach a geotransform for the output bands
    pub fn with_transform(mut self, transform: GeoTransform) -> Self {
        self.transform = transform;
        self
    }
}

impl<F> TimeSeriesSource for SeriesFn<F>
where
    F: Fn(usize, usize) -> Result<MonthlySeries> + Sync,
{
    fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    fn transform(&self) -> GeoTransform {
        self.transform
    }

    fn read_tile(&self, tile: &Tile) -> Result<Vec<MonthlySeries>> {
        tile.cells().map(|(row, col)| (self.f)(row, col)).collect()
    }
}
