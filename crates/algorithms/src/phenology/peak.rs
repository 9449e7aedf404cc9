//! Seasonal peak value and month

use super::boundary::BoundaryValues;
use super::series::MonthlySeries;
use super::window::SeasonWindow;
use serde::{Deserialize, Serialize};

/// Default absolute tolerance for matching the peak value
pub const DEFAULT_PEAK_TOLERANCE: f64 = 1e-6;

/// Highest in-season value and the month where it first occurs
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PeakRecord {
    pub peak_value: f64,
    /// Earliest month within `tolerance` of `peak_value`; 0 for an empty season
    pub peak_month: u8,
}

impl PeakRecord {
    /// Seasonal amplitude above the boundary baseline
    pub fn amplitude(&self, boundaries: &BoundaryValues) -> f64 {
        self.peak_value - boundaries.base_val
    }
}

/// Find the seasonal peak over the observed months of `window`.
///
/// Ties are resolved by scanning months in ascending order and taking the
/// first whose value is within `tolerance` of the maximum, so the result
/// does not depend on float noise between near-equal months. A tolerance
/// that matches nothing (negative or NaN) falls back to the first month
/// holding the exact maximum.
pub fn resolve_peak(series: &MonthlySeries, window: &SeasonWindow, tolerance: f64) -> PeakRecord {
    let Some(peak_value) = series
        .observed_in(window.months())
        .map(|(_, v)| v)
        .reduce(f64::max)
    else {
        return PeakRecord::default();
    };

    let peak_month = series
        .observed_in(window.months())
        .find(|&(_, v)| (v - peak_value).abs() <= tolerance)
        .or_else(|| series.observed_in(window.months()).find(|&(_, v)| v == peak_value))
        .map_or(0, |(m, _)| m);

    PeakRecord {
        peak_value,
        peak_month,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phenology::series::MONTHS;
    use approx::assert_relative_eq;

    #[test]
    fn test_near_tie_picks_earliest_month() {
        let mut values = [Some(0.2); MONTHS];
        values[4] = Some(0.8 - 5e-7); // May
        values[6] = Some(0.8); // July
        let series = MonthlySeries::from_options(values);
        let window = SeasonWindow { start_month: 3, end_month: 9 };

        let peak = resolve_peak(&series, &window, DEFAULT_PEAK_TOLERANCE);
        assert_relative_eq!(peak.peak_value, 0.8);
        assert_eq!(peak.peak_month, 5);
    }

    #[test]
    fn test_values_outside_window_are_ignored() {
        let mut values = [Some(0.3); MONTHS];
        values[0] = Some(0.95);
        values[7] = Some(0.6);
        let series = MonthlySeries::from_options(values);
        let window = SeasonWindow { start_month: 6, end_month: 10 };

        let peak = resolve_peak(&series, &window, DEFAULT_PEAK_TOLERANCE);
        assert_eq!(peak.peak_month, 8);
        assert_relative_eq!(peak.peak_value, 0.6);
    }

    #[test]
    fn test_missing_months_inside_window() {
        let mut values = [Some(0.3); MONTHS];
        values[4] = None;
        values[5] = Some(0.7);
        let series = MonthlySeries::from_options(values);
        let window = SeasonWindow { start_month: 4, end_month: 7 };

        let peak = resolve_peak(&series, &window, DEFAULT_PEAK_TOLERANCE);
        assert_eq!(peak.peak_month, 6);
    }

    #[test]
    fn test_unusable_tolerance_still_finds_peak() {
        let mut values = [Some(0.1); MONTHS];
        values[5] = Some(0.9);
        let series = MonthlySeries::from_options(values);
        let window = SeasonWindow { start_month: 6, end_month: 6 };

        for tolerance in [f64::NAN, -1.0] {
            let peak = resolve_peak(&series, &window, tolerance);
            assert_eq!(peak.peak_month, 6);
            assert_relative_eq!(peak.peak_value, 0.9);
        }

        let wide = SeasonWindow { start_month: 1, end_month: 12 };
        values[8] = Some(0.9);
        let series = MonthlySeries::from_options(values);
        assert_eq!(resolve_peak(&series, &wide, f64::NAN).peak_month, 6);
    }

    #[test]
    fn test_empty_window() {
        let series = MonthlySeries::from_options([Some(0.3); MONTHS]);
        assert_eq!(
            resolve_peak(&series, &SeasonWindow::EMPTY, DEFAULT_PEAK_TOLERANCE),
            PeakRecord::default()
        );
    }

    #[test]
    fn test_amplitude() {
        let peak = PeakRecord { peak_value: 0.9, peak_month: 7 };
        let base = BoundaryValues { start_val: 0.5, end_val: 0.3, base_val: 0.4 };
        assert_relative_eq!(peak.amplitude(&base), 0.5);
    }
}
