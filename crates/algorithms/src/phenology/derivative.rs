//! Month-to-month rates of change inside the season

use super::series::{MonthlySeries, MONTHS};
use super::window::SeasonWindow;
use serde::{Deserialize, Serialize};

/// Extreme in-season month-to-month changes
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RateExtremes {
    /// Largest `value(m + 1) - value(m)`; 0 when no pair is defined
    pub max_increase: f64,
    /// Negated smallest difference, so a steepest fall of `-0.3` reads `0.3`;
    /// 0 when no pair is defined
    pub min_decrease: f64,
}

/// Differences `value(m + 1) - value(m)` keyed by `m`.
///
/// A difference exists only when both months lie inside the window and are
/// observed; pairs straddling a window edge or a missing month are skipped.
pub fn season_differences<'a>(
    series: &'a MonthlySeries,
    window: &SeasonWindow,
) -> impl Iterator<Item = (u8, f64)> + 'a {
    let window = *window;
    (1..MONTHS as u8).filter_map(move |m| {
        if !(window.contains(m) && window.contains(m + 1)) {
            return None;
        }
        let before = series.observed(m)?;
        let after = series.observed(m + 1)?;
        Some((m, after - before))
    })
}

/// Reduce the in-season differences to the steepest rise and fall.
pub fn analyze_rates(series: &MonthlySeries, window: &SeasonWindow) -> RateExtremes {
    let extremes = season_differences(series, window).fold(None, |acc: Option<(f64, f64)>, (_, d)| {
        Some(match acc {
            None => (d, d),
            Some((hi, lo)) => (hi.max(d), lo.min(d)),
        })
    });

    match extremes {
        // 0.0 - lo keeps a zero difference from turning into -0.0
        Some((hi, lo)) => RateExtremes {
            max_increase: hi,
            min_decrease: 0.0 - lo,
        },
        None => RateExtremes::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp() -> MonthlySeries {
        MonthlySeries::from_options([
            Some(0.1),
            Some(0.2),
            Some(0.5),
            Some(0.7),
            Some(0.8),
            Some(0.6),
            Some(0.2),
            Some(0.1),
            Some(0.9),
            Some(0.1),
            Some(0.1),
            Some(0.1),
        ])
    }

    #[test]
    fn test_only_in_season_pairs() {
        let window = SeasonWindow { start_month: 3, end_month: 7 };
        let diffs: Vec<_> = season_differences(&ramp(), &window).map(|(m, _)| m).collect();
        assert_eq!(diffs, vec![3, 4, 5, 6]);

        let rates = analyze_rates(&ramp(), &window);
        assert_relative_eq!(rates.max_increase, 0.2, epsilon = 1e-12);
        assert_relative_eq!(rates.min_decrease, 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_differences_borrow_only_the_series() {
        let series = ramp();
        let diffs = {
            let window = SeasonWindow { start_month: 8, end_month: 10 };
            season_differences(&series, &window)
        };
        let diffs: Vec<_> = diffs.collect();
        assert_eq!(diffs.len(), 2);
        assert_relative_eq!(diffs[0].1, 0.8, epsilon = 1e-12);
        assert_relative_eq!(diffs[1].1, -0.8, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_month_breaks_pairs() {
        let mut values = [Some(0.4); MONTHS];
        values[4] = None;
        values[3] = Some(0.1);
        values[5] = Some(0.9);
        let series = MonthlySeries::from_options(values);
        let window = SeasonWindow { start_month: 3, end_month: 7 };

        let months: Vec<_> = season_differences(&series, &window).map(|(m, _)| m).collect();
        assert_eq!(months, vec![3, 6]);
    }

    #[test]
    fn test_no_pairs_yields_zero() {
        let single = SeasonWindow { start_month: 6, end_month: 6 };
        assert_eq!(analyze_rates(&ramp(), &single), RateExtremes::default());
        assert_eq!(analyze_rates(&ramp(), &SeasonWindow::EMPTY), RateExtremes::default());
    }

    #[test]
    fn test_monotonic_rise_has_no_decrease() {
        let window = SeasonWindow { start_month: 1, end_month: 5 };
        let rates = analyze_rates(&ramp(), &window);
        assert_relative_eq!(rates.max_increase, 0.3, epsilon = 1e-12);
        // smallest difference is positive, so the decrease is negative
        assert_relative_eq!(rates.min_decrease, -0.1, epsilon = 1e-12);
    }
}
