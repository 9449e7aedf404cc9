//! Run configuration for the phenology pipeline

use super::peak::DEFAULT_PEAK_TOLERANCE;
use serde::{Deserialize, Serialize};
use verdant_core::{Error, Result};

/// Default fraction of the annual maximum that opens the season
pub const DEFAULT_THRESHOLD_FRACTION: f64 = 0.5;

/// Parameters for phenology extraction.
///
/// One instance describes one analysis year of one vegetation index; running
/// several years means running the pipeline once per parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhenologyParams {
    /// Name of the vegetation index band (default: "NDVI"); used for labelling only
    pub index_name: String,
    /// Analysis year, if known
    pub year: Option<i32>,
    /// Fraction of the annual maximum a month must exceed (default: 0.5)
    pub threshold_fraction: f64,
    /// Absolute tolerance when matching the peak value (default: 1e-6)
    pub peak_tolerance: f64,
}

impl Default for PhenologyParams {
    fn default() -> Self {
        Self {
            index_name: "NDVI".to_string(),
            year: None,
            threshold_fraction: DEFAULT_THRESHOLD_FRACTION,
            peak_tolerance: DEFAULT_PEAK_TOLERANCE,
        }
    }
}

impl PhenologyParams {
    /// Parameters for a given index and year with default thresholds
    pub fn for_year(index_name: impl Into<String>, year: i32) -> Self {
        Self {
            index_name: index_name.into(),
            year: Some(year),
            ..Self::default()
        }
    }

    /// Check that the numeric parameters are usable
    pub fn validate(&self) -> Result<()> {
        if !self.threshold_fraction.is_finite() || !(0.0..=1.0).contains(&self.threshold_fraction) {
            return Err(Error::InvalidParameter {
                name: "threshold_fraction",
                value: self.threshold_fraction.to_string(),
                reason: "must be a finite value in [0, 1]".to_string(),
            });
        }
        if !self.peak_tolerance.is_finite() || self.peak_tolerance < 0.0 {
            return Err(Error::InvalidParameter {
                name: "peak_tolerance",
                value: self.peak_tolerance.to_string(),
                reason: "must be finite and non-negative".to_string(),
            });
        }
        Ok(())
    }

    /// Human-readable label such as `NDVI 2024`
    pub fn label(&self) -> String {
        match self.year {
            Some(year) => format!("{} {}", self.index_name, year),
            None => self.index_name.clone(),
        }
    }
}
