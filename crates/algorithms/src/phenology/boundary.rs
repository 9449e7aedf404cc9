//! Index values at the season boundaries

use super::series::MonthlySeries;
use super::window::SeasonWindow;
use serde::{Deserialize, Serialize};

/// Values at the start and end months and their mean
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundaryValues {
    pub start_val: f64,
    pub end_val: f64,
    /// `(start_val + end_val) / 2`
    pub base_val: f64,
}

/// Look up the boundary values of `window`.
///
/// A sentinel month (0) contributes `0.0`, so an empty season yields a
/// fully numeric record of zeros.
pub fn resolve_boundaries(series: &MonthlySeries, window: &SeasonWindow) -> BoundaryValues {
    let value_at = |month: u8| {
        if month == 0 {
            0.0
        } else {
            // boundary months qualified, so they are always observed
            series.observed(month).unwrap_or(0.0)
        }
    };

    let start_val = value_at(window.start_month);
    let end_val = value_at(window.end_month);

    BoundaryValues {
        start_val,
        end_val,
        base_val: (start_val + end_val) / 2.0,
    }
}
