//! Fixed-schema phenology feature record

use super::boundary::BoundaryValues;
use super::cumulative::CumulativeSums;
use super::derivative::RateExtremes;
use super::peak::PeakRecord;
use super::threshold::Threshold;
use super::window::SeasonWindow;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use verdant_core::Error;

/// Number of phenology features per pixel
pub const FEATURE_COUNT: usize = 14;

/// Phenology feature fields, in output order.
///
/// Names and order are part of the contract with downstream sampling and
/// classification steps and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureField {
    #[serde(rename = "NDVImax")]
    NdviMax,
    #[serde(rename = "NDVIthr")]
    NdviThr,
    #[serde(rename = "Month_start_val")]
    MonthStart,
    #[serde(rename = "Month_peak_val")]
    MonthPeak,
    #[serde(rename = "Month_end_val")]
    MonthEnd,
    #[serde(rename = "Start_val")]
    StartVal,
    #[serde(rename = "End_val")]
    EndVal,
    #[serde(rename = "Base_val")]
    BaseVal,
    #[serde(rename = "Peak_val")]
    PeakVal,
    #[serde(rename = "Ampl")]
    Ampl,
    #[serde(rename = "L_cumulative")]
    LCumulative,
    #[serde(rename = "R_cumulative")]
    RCumulative,
    #[serde(rename = "Max_increase")]
    MaxIncrease,
    #[serde(rename = "Min_decrease")]
    MinDecrease,
}

impl FeatureField {
    /// All fields in contract order
    pub const ALL: [FeatureField; FEATURE_COUNT] = [
        FeatureField::NdviMax,
        FeatureField::NdviThr,
        FeatureField::MonthStart,
        FeatureField::MonthPeak,
        FeatureField::MonthEnd,
        FeatureField::StartVal,
        FeatureField::EndVal,
        FeatureField::BaseVal,
        FeatureField::PeakVal,
        FeatureField::Ampl,
        FeatureField::LCumulative,
        FeatureField::RCumulative,
        FeatureField::MaxIncrease,
        FeatureField::MinDecrease,
    ];

    /// Band name used in every output
    pub fn name(&self) -> &'static str {
        match self {
            FeatureField::NdviMax => "NDVImax",
            FeatureField::NdviThr => "NDVIthr",
            FeatureField::MonthStart => "Month_start_val",
            FeatureField::MonthPeak => "Month_peak_val",
            FeatureField::MonthEnd => "Month_end_val",
            FeatureField::StartVal => "Start_val",
            FeatureField::EndVal => "End_val",
            FeatureField::BaseVal => "Base_val",
            FeatureField::PeakVal => "Peak_val",
            FeatureField::Ampl => "Ampl",
            FeatureField::LCumulative => "L_cumulative",
            FeatureField::RCumulative => "R_cumulative",
            FeatureField::MaxIncrease => "Max_increase",
            FeatureField::MinDecrease => "Min_decrease",
        }
    }

    /// Position in the record
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Whether the field holds a month index rather than an index value
    pub fn is_month(&self) -> bool {
        matches!(
            self,
            FeatureField::MonthStart | FeatureField::MonthPeak | FeatureField::MonthEnd
        )
    }
}

impl fmt::Display for FeatureField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for FeatureField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureField::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| Error::UnknownBand(s.to_string()))
    }
}

/// The fourteen phenology scalars of one pixel, in contract order.
///
/// Only the assembler constructs a populated record; there are no setters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    /// Value of one field
    pub fn get(&self, field: FeatureField) -> f64 {
        self.values[field.index()]
    }

    /// All values in contract order
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        self.values
    }

    /// `(field, value)` pairs in contract order
    pub fn iter(&self) -> impl Iterator<Item = (FeatureField, f64)> + '_ {
        FeatureField::ALL.into_iter().map(move |f| (f, self.get(f)))
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(FEATURE_COUNT))?;
        for (field, value) in self.iter() {
            map.serialize_entry(field.name(), &value)?;
        }
        map.end()
    }
}

/// Outcome of the pipeline for one pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PixelPhenology {
    /// Every month was missing; nothing was computed
    NoData,
    /// Features were computed (possibly for an empty season)
    Computed(FeatureVector),
}

/// Coarse classification of a pixel result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelStatus {
    NoData,
    EmptySeason,
    Season,
}

impl PixelPhenology {
    /// Feature values; a no-data pixel reads as all zeros
    pub fn features(&self) -> FeatureVector {
        match self {
            PixelPhenology::NoData => FeatureVector::default(),
            PixelPhenology::Computed(fv) => *fv,
        }
    }

    /// Whether the pixel carried no observation at all
    pub fn is_no_data(&self) -> bool {
        matches!(self, PixelPhenology::NoData)
    }

    pub fn status(&self) -> PixelStatus {
        match self {
            PixelPhenology::NoData => PixelStatus::NoData,
            PixelPhenology::Computed(fv) if fv.get(FeatureField::MonthStart) == 0.0 => {
                PixelStatus::EmptySeason
            }
            PixelPhenology::Computed(_) => PixelStatus::Season,
        }
    }
}

/// Merge the stage outputs into the fixed-order record.
pub fn assemble(
    threshold: &Threshold,
    window: &SeasonWindow,
    boundaries: &BoundaryValues,
    peak: &PeakRecord,
    sums: &CumulativeSums,
    rates: &RateExtremes,
) -> FeatureVector {
    FeatureVector {
        values: [
            threshold.max_value,
            threshold.threshold,
            f64::from(window.start_month),
            f64::from(peak.peak_month),
            f64::from(window.end_month),
            boundaries.start_val,
            boundaries.end_val,
            boundaries.base_val,
            peak.peak_value,
            peak.amplitude(boundaries),
            sums.left,
            sums.right,
            rates.max_increase,
            rates.min_decrease,
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_order_and_names() {
        let names: Vec<_> = FeatureField::ALL.iter().map(|f| f.name()).collect();
        assert_eq!(
            names,
            vec![
                "NDVImax",
                "NDVIthr",
                "Month_start_val",
                "Month_peak_val",
                "Month_end_val",
                "Start_val",
                "End_val",
                "Base_val",
                "Peak_val",
                "Ampl",
                "L_cumulative",
                "R_cumulative",
                "Max_increase",
                "Min_decrease",
            ]
        );
        for (i, f) in FeatureField::ALL.iter().enumerate() {
            assert_eq!(f.index(), i);
        }
    }

    #[test]
    fn test_field_parsing() {
        assert_eq!("Ampl".parse::<FeatureField>().unwrap(), FeatureField::Ampl);
        assert!("ampl".parse::<FeatureField>().is_err());
        assert!(FeatureField::MonthPeak.is_month());
        assert!(!FeatureField::PeakVal.is_month());
    }

    #[test]
    fn test_assemble_places_every_stage() {
        let fv = assemble(
            &Threshold { max_value: 0.8, threshold: 0.4 },
            &SeasonWindow { start_month: 4, end_month: 9 },
            &BoundaryValues { start_val: 0.5, end_val: 0.45, base_val: 0.475 },
            &PeakRecord { peak_value: 0.8, peak_month: 7 },
            &CumulativeSums { left: 2.4, right: 2.1 },
            &RateExtremes { max_increase: 0.2, min_decrease: 0.15 },
        );

        assert_eq!(fv.get(FeatureField::MonthStart), 4.0);
        assert_eq!(fv.get(FeatureField::MonthPeak), 7.0);
        assert_eq!(fv.get(FeatureField::MonthEnd), 9.0);
        assert_eq!(fv.get(FeatureField::LCumulative), 2.4);
        assert!((fv.get(FeatureField::Ampl) - 0.325).abs() < 1e-12);
        assert_eq!(fv.to_array()[13], 0.15);
    }

    #[test]
    fn test_no_data_reads_as_zeros() {
        let px = PixelPhenology::NoData;
        assert!(px.is_no_data());
        assert_eq!(px.status(), PixelStatus::NoData);
        assert!(px.features().iter().all(|(_, v)| v == 0.0));
    }

    #[test]
    fn test_serialized_keys_follow_contract() {
        let json = serde_json::to_string(&FeatureVector::default()).unwrap();
        assert!(json.starts_with("{\"NDVImax\":0.0,\"NDVIthr\":0.0,\"Month_start_val\""));
        assert!(json.ends_with("\"Min_decrease\":0.0}"));
    }
}
