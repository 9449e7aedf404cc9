//! Annual maximum and season-entry threshold

use super::series::MonthlySeries;
use serde::{Deserialize, Serialize};

/// Annual maximum of the observed months and the derived threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    /// Maximum over observed months
    pub max_value: f64,
    /// `fraction * max_value`
    pub threshold: f64,
}

/// Compute the annual maximum and the season-entry threshold.
///
/// Missing months are excluded from the maximum. Returns `None` when all
/// twelve months are missing: the pixel has no data, which is distinct from
/// a pixel whose season is merely empty.
pub fn detect_threshold(series: &MonthlySeries, fraction: f64) -> Option<Threshold> {
    let max_value = series
        .iter_observed()
        .map(|(_, v)| v)
        .reduce(f64::max)?;

    Some(Threshold {
        max_value,
        threshold: fraction * max_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phenology::series::MONTHS;
    use approx::assert_relative_eq;

    #[test]
    fn test_missing_months_are_not_zero() {
        let mut values = [None; MONTHS];
        values[3] = Some(-0.2);
        values[8] = Some(-0.05);
        let series = MonthlySeries::from_options(values);

        // a zero fill would have produced max = 0.0
        let thr = detect_threshold(&series, 0.5).unwrap();
        assert_relative_eq!(thr.max_value, -0.05);
        assert_relative_eq!(thr.threshold, -0.025);
    }

    #[test]
    fn test_all_missing_has_no_threshold() {
        assert_eq!(detect_threshold(&MonthlySeries::all_missing(), 0.5), None);
    }

    #[test]
    fn test_fraction_is_applied() {
        let series = MonthlySeries::from_options([Some(0.8); MONTHS]);
        let thr = detect_threshold(&series, 0.25).unwrap();
        assert_relative_eq!(thr.threshold, 0.2);
    }
}
