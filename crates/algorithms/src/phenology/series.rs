//! Twelve-month vegetation index series for a single pixel

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use verdant_core::{Error, RasterElement, Result};

/// Number of monthly slots in a series
pub const MONTHS: usize = 12;

/// One monthly slot of a series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Observation {
    /// A finite index value from a cloud-free composite
    Observed(f64),
    /// No valid observation for the month
    Missing,
}

impl Observation {
    /// The observed value, if any
    pub fn value(self) -> Option<f64> {
        match self {
            Observation::Observed(v) => Some(v),
            Observation::Missing => None,
        }
    }
}

/// Per-pixel series of twelve monthly observations, January first.
///
/// Values are held in a fixed array alongside a validity bitmask: bit
/// `m - 1` is set iff month `m` is observed. Missing slots hold `0.0` in the
/// array but every reduction in the phenology stages consults the mask
/// first, so that placeholder never reaches a result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlySeries {
    values: [f64; MONTHS],
    valid: u16,
}

impl MonthlySeries {
    /// Build a series from twelve observations.
    ///
    /// Non-finite `Observed` values are stored as missing.
    pub fn new(slots: [Observation; MONTHS]) -> Self {
        Self::from_options(slots.map(Observation::value))
    }

    /// Build a series from twelve optional values; `None` and non-finite values are missing.
    pub fn from_options(values: [Option<f64>; MONTHS]) -> Self {
        let mut series = Self::all_missing();
        for (i, value) in values.into_iter().enumerate() {
            if let Some(v) = value.filter(|v| v.is_finite()) {
                series.values[i] = v;
                series.valid |= 1 << i;
            }
        }
        series
    }

    /// Build a series from raw composite values.
    ///
    /// NaN, infinities and values matching `nodata` become missing months,
    /// using the same tolerance as raster cells.
    pub fn from_values(values: &[f64], nodata: Option<f64>) -> Result<Self> {
        if values.len() != MONTHS {
            return Err(Error::MonthCount {
                expected: MONTHS,
                actual: values.len(),
            });
        }

        let mut options = [None; MONTHS];
        for (slot, &v) in options.iter_mut().zip(values) {
            if !v.is_nodata(nodata) {
                *slot = Some(v);
            }
        }
        Ok(Self::from_options(options))
    }

    /// A series with no observed month
    pub fn all_missing() -> Self {
        Self {
            values: [0.0; MONTHS],
            valid: 0,
        }
    }

    /// Month indices, 1 through 12
    pub fn months() -> RangeInclusive<u8> {
        1..=MONTHS as u8
    }

    /// Observation for `month` (1-based); `None` outside 1..=12
    pub fn get(&self, month: u8) -> Option<Observation> {
        let idx = Self::slot(month)?;
        Some(if self.valid & (1 << idx) != 0 {
            Observation::Observed(self.values[idx])
        } else {
            Observation::Missing
        })
    }

    /// Observed value for `month`; `None` if missing or out of range
    pub fn observed(&self, month: u8) -> Option<f64> {
        self.get(month).and_then(Observation::value)
    }

    /// Validity bitmask, bit `m - 1` set for observed month `m`
    pub fn validity_mask(&self) -> u16 {
        self.valid
    }

    /// Number of observed months
    pub fn observed_count(&self) -> usize {
        self.valid.count_ones() as usize
    }

    /// Whether every month is missing
    pub fn is_all_missing(&self) -> bool {
        self.valid == 0
    }

    /// Observed `(month, value)` pairs in ascending month order
    pub fn iter_observed(&self) -> impl Iterator<Item = (u8, f64)> + '_ {
        Self::months().filter_map(move |m| self.observed(m).map(|v| (m, v)))
    }

    /// Observed `(month, value)` pairs restricted to `months`
    pub fn observed_in(&self, months: RangeInclusive<u8>) -> impl Iterator<Item = (u8, f64)> + '_ {
        months.filter_map(move |m| self.observed(m).map(|v| (m, v)))
    }

    /// All twelve slots in month order
    pub fn observations(&self) -> [Observation; MONTHS] {
        let mut out = [Observation::Missing; MONTHS];
        for (i, slot) in out.iter_mut().enumerate() {
            if let Some(obs) = self.get(i as u8 + 1) {
                *slot = obs;
            }
        }
        out
    }

    fn slot(month: u8) -> Option<usize> {
        (1..=MONTHS as u8).contains(&month).then(|| month as usize - 1)
    }
}

impl Default for MonthlySeries {
    fn default() -> Self {
        Self::all_missing()
    }
}
