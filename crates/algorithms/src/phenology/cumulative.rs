//! Cumulative index before and after the peak

use super::peak::PeakRecord;
use super::series::MonthlySeries;
use super::window::SeasonWindow;
use serde::{Deserialize, Serialize};

/// Sums of the observed in-season values on each side of the peak month.
///
/// The peak month is included in both sums.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CumulativeSums {
    /// Sum over `start_month ..= peak_month`
    pub left: f64,
    /// Sum over `peak_month ..= end_month`
    pub right: f64,
}

/// Integrate the season on both sides of the peak. Missing months add nothing.
pub fn integrate(series: &MonthlySeries, window: &SeasonWindow, peak: &PeakRecord) -> CumulativeSums {
    if window.is_empty() || peak.peak_month == 0 {
        return CumulativeSums::default();
    }

    let sum = |months| series.observed_in(months).map(|(_, v)| v).sum::<f64>();

    CumulativeSums {
        left: sum(window.start_month..=peak.peak_month),
        right: sum(peak.peak_month..=window.end_month),
    }
}
