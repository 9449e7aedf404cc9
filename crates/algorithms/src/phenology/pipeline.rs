//! Per-pixel phenology pipeline
//!
//! Stages run in a fixed order and each consumes only the series and the
//! outputs of earlier stages:
//!
//! ```text
//! series ─> threshold ─> window ─> boundaries ─> peak ─> cumulative sums
//!                              └──────────────────────> rates of change
//! ```

use super::boundary::{resolve_boundaries, BoundaryValues};
use super::cumulative::{integrate, CumulativeSums};
use super::derivative::{analyze_rates, RateExtremes};
use super::features::{assemble, FeatureVector, PixelPhenology};
use super::params::PhenologyParams;
use super::peak::{resolve_peak, PeakRecord};
use super::series::MonthlySeries;
use super::threshold::{detect_threshold, Threshold};
use super::window::{resolve_window, SeasonWindow};
use serde::Serialize;

/// Every intermediate result of one pixel's run.
///
/// Built once by [`analyze_series`] and never modified; the feature record
/// is a flat projection of it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeasonAnalysis {
    pub threshold: Threshold,
    pub window: SeasonWindow,
    pub boundaries: BoundaryValues,
    pub peak: PeakRecord,
    pub sums: CumulativeSums,
    pub rates: RateExtremes,
}

impl SeasonAnalysis {
    /// Flatten into the fixed-order feature record
    pub fn features(&self) -> FeatureVector {
        assemble(
            &self.threshold,
            &self.window,
            &self.boundaries,
            &self.peak,
            &self.sums,
            &self.rates,
        )
    }
}

/// Run every stage on one series.
///
/// Returns `None` when every month is missing. `params` is expected to have
/// passed [`PhenologyParams::validate`].
pub fn analyze_series(series: &MonthlySeries, params: &PhenologyParams) -> Option<SeasonAnalysis> {
    let threshold = detect_threshold(series, params.threshold_fraction)?;
    let window = resolve_window(series, &threshold);
    let boundaries = resolve_boundaries(series, &window);
    let peak = resolve_peak(series, &window, params.peak_tolerance);
    let sums = integrate(series, &window, &peak);
    let rates = analyze_rates(series, &window);

    Some(SeasonAnalysis {
        threshold,
        window,
        boundaries,
        peak,
        sums,
        rates,
    })
}

/// Compute the phenology features of one pixel.
pub fn phenology_pixel(series: &MonthlySeries, params: &PhenologyParams) -> PixelPhenology {
    match analyze_series(series, params) {
        Some(analysis) => PixelPhenology::Computed(analysis.features()),
        None => PixelPhenology::NoData,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phenology::features::{FeatureField, PixelStatus};
    use crate::phenology::series::MONTHS;
    use approx::assert_relative_eq;

    #[test]
    fn test_typical_season() {
        let series = MonthlySeries::from_options([
            Some(0.12),
            Some(0.15),
            Some(0.22),
            Some(0.41),
            Some(0.63),
            Some(0.78),
            Some(0.81),
            Some(0.70),
            Some(0.52),
            Some(0.33),
            Some(0.18),
            Some(0.13),
        ]);
        let analysis = analyze_series(&series, &PhenologyParams::default()).unwrap();

        assert_relative_eq!(analysis.threshold.threshold, 0.405);
        assert_eq!(analysis.window, SeasonWindow { start_month: 4, end_month: 9 });
        assert_eq!(analysis.peak.peak_month, 7);
        assert_relative_eq!(analysis.boundaries.base_val, (0.41 + 0.52) / 2.0);
        assert_relative_eq!(analysis.sums.left, 0.41 + 0.63 + 0.78 + 0.81, epsilon = 1e-12);
        assert_relative_eq!(analysis.sums.right, 0.81 + 0.70 + 0.52, epsilon = 1e-12);
        assert_relative_eq!(analysis.rates.max_increase, 0.22, epsilon = 1e-12);
        assert_relative_eq!(analysis.rates.min_decrease, 0.18, epsilon = 1e-12);

        let px = phenology_pixel(&series, &PhenologyParams::default());
        assert_eq!(px.status(), PixelStatus::Season);
        assert_relative_eq!(px.features().get(FeatureField::Ampl), 0.81 - 0.465, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_season_is_not_no_data() {
        // with a negative maximum, half of it lies above every month
        let series = MonthlySeries::from_options([Some(-0.1); MONTHS]);
        let px = phenology_pixel(&series, &PhenologyParams::default());

        assert_eq!(px.status(), PixelStatus::EmptySeason);
        let fv = px.features();
        assert_relative_eq!(fv.get(FeatureField::NdviMax), -0.1);
        assert_relative_eq!(fv.get(FeatureField::NdviThr), -0.05);
        for field in FeatureField::ALL.iter().skip(2) {
            assert_eq!(fv.get(*field), 0.0, "{} should fall back to zero", field);
        }
    }

    #[test]
    fn test_threshold_fraction_moves_window() {
        let series = MonthlySeries::from_options([
            Some(0.1),
            Some(0.2),
            Some(0.3),
            Some(0.4),
            Some(0.5),
            Some(0.6),
            Some(0.5),
            Some(0.4),
            Some(0.3),
            Some(0.2),
            Some(0.1),
            Some(0.1),
        ]);
        let wide = PhenologyParams {
            threshold_fraction: 0.2,
            ..Default::default()
        };
        let narrow = PhenologyParams {
            threshold_fraction: 0.9,
            ..Default::default()
        };

        assert_eq!(
            analyze_series(&series, &wide).unwrap().window,
            SeasonWindow { start_month: 2, end_month: 10 }
        );
        assert_eq!(
            analyze_series(&series, &narrow).unwrap().window,
            SeasonWindow { start_month: 6, end_month: 6 }
        );
    }
}
