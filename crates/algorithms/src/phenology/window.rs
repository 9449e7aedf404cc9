//! Growing-season window from threshold crossings

use super::series::MonthlySeries;
use super::threshold::Threshold;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// First and last qualifying month of the growing season.
///
/// Month `0` in both fields is the "no season" sentinel; it never means January.
/// The window spans the extreme qualifying months, so months inside it may
/// themselves be below the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeasonWindow {
    pub start_month: u8,
    pub end_month: u8,
}

impl SeasonWindow {
    /// The window of a pixel where no month exceeds the threshold
    pub const EMPTY: SeasonWindow = SeasonWindow {
        start_month: 0,
        end_month: 0,
    };

    /// Whether no month qualified
    pub fn is_empty(&self) -> bool {
        self.start_month == 0
    }

    /// Whether `month` lies inside the window (always false for the empty window)
    pub fn contains(&self, month: u8) -> bool {
        !self.is_empty() && self.start_month <= month && month <= self.end_month
    }

    /// Months of the window; an empty range for the empty window
    pub fn months(&self) -> RangeInclusive<u8> {
        if self.is_empty() {
            // 1..=0 yields nothing
            1..=0
        } else {
            self.start_month..=self.end_month
        }
    }

    /// Number of months spanned, including any below-threshold months inside
    pub fn span(&self) -> usize {
        self.months().count()
    }
}

/// Bitmask of months whose observed value is strictly above the threshold
pub fn qualifying_months(series: &MonthlySeries, threshold: &Threshold) -> u16 {
    series
        .iter_observed()
        .filter(|&(_, v)| v > threshold.threshold)
        .fold(0u16, |mask, (m, _)| mask | 1 << (m - 1))
}

/// Resolve the season window as the minimum and maximum qualifying month.
pub fn resolve_window(series: &MonthlySeries, threshold: &Threshold) -> SeasonWindow {
    let mask = qualifying_months(series, threshold);
    if mask == 0 {
        return SeasonWindow::EMPTY;
    }

    SeasonWindow {
        start_month: mask.trailing_zeros() as u8 + 1,
        end_month: (16 - mask.leading_zeros()) as u8,
    }
}
