//! Per-pixel phenology from monthly vegetation index composites
//!
//! Each pixel's twelve monthly values are reduced to fourteen descriptors:
//! - Threshold: annual maximum and the fraction of it that opens the season
//! - Season window: first and last month above the threshold
//! - Boundaries and peak: index values at the window edges and its maximum
//! - Cumulative sums: activity before and after the peak
//! - Rates: steepest month-to-month rise and fall within the season
//!
//! Missing months are skipped by every stage. A pixel with no observation
//! at all yields [`PixelPhenology::NoData`].

mod boundary;
mod cumulative;
mod derivative;
mod features;
mod params;
mod peak;
mod pipeline;
mod raster;
mod series;
mod source;
mod stack;
mod threshold;
mod window;

pub use boundary::{resolve_boundaries, BoundaryValues};
pub use cumulative::{integrate, CumulativeSums};
pub use derivative::{analyze_rates, season_differences, RateExtremes};
pub use features::{
    assemble, FeatureField, FeatureVector, PixelPhenology, PixelStatus, FEATURE_COUNT,
};
pub use params::{PhenologyParams, DEFAULT_THRESHOLD_FRACTION};
pub use peak::{resolve_peak, PeakRecord, DEFAULT_PEAK_TOLERANCE};
pub use pipeline::{analyze_series, phenology_pixel, SeasonAnalysis};
pub use raster::{
    phenology_raster, phenology_tiles, Phenology, PhenologyBands, ProcessingOptions, RunSummary,
};
pub use series::{MonthlySeries, Observation, MONTHS};
pub use source::{GeoTiffStack, MonthlyStack, SeriesFn, TimeSeriesSource};
pub use stack::FeatureStack;
pub use threshold::{detect_threshold, Threshold};
pub use window::{qualifying_months, resolve_window, SeasonWindow};
