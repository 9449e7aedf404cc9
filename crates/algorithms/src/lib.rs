//! # Verdant Algorithms
//!
//! Vegetation phenology analysis for Verdant.
//!
//! ## Modules
//!
//! - **phenology**: season detection, peak, cumulative activity and rate
//!   extremes per pixel, the tiled raster driver and feature stacks

pub mod phenology;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::phenology::{
        phenology_pixel, phenology_raster, phenology_tiles,
        FeatureField, FeatureStack, FeatureVector, GeoTiffStack, MonthlySeries, MonthlyStack, Observation,
        Phenology, PhenologyBands, PhenologyParams, PixelPhenology, ProcessingOptions,
        SeriesFn, TimeSeriesSource,
    };
    pub use verdant_parallel::ProcessingMode;
    pub use verdant_core::prelude::*;
}
