//! Named band stack handed to downstream sampling and classification

use super::raster::PhenologyBands;
use verdant_core::raster::Raster;
use verdant_core::{Error, Result};

/// An ordered set of uniquely named, co-registered bands.
///
/// Starts from the fourteen phenology bands and accepts further bands
/// (spectral indices, texture, backscatter) computed elsewhere on the same grid.
#[derive(Debug, Clone, Default)]
pub struct FeatureStack {
    bands: Vec<(String, Raster<f64>)>,
}

impl FeatureStack {
    /// Empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Stack holding the phenology bands under their contract names
    pub fn from_phenology(bands: PhenologyBands) -> Self {
        Self {
            bands: bands
                .into_bands()
                .into_iter()
                .map(|(field, raster)| (field.name().to_string(), raster))
                .collect(),
        }
    }

    /// Append a band.
    ///
    /// Names must be unique, and the band must share the shape and grid of
    /// the bands already present.
    pub fn push_band(&mut self, name: impl Into<String>, raster: Raster<f64>) -> Result<()> {
        let name = name.into();
        if self.band(&name).is_some() {
            return Err(Error::DuplicateBand(name));
        }

        if let Some((_, first)) = self.bands.first() {
            if raster.shape() != first.shape() {
                return Err(Error::SizeMismatch {
                    er: first.rows(),
                    ec: first.cols(),
                    ar: raster.rows(),
                    ac: raster.cols(),
                });
            }
            if !raster.transform().is_aligned_with(first.transform()) {
                return Err(Error::GridMismatch {
                    band: self.bands.len() + 1,
                });
            }
        }

        self.bands.push((name, raster));
        Ok(())
    }

    /// New stack with the named bands, in the requested order
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<FeatureStack> {
        let mut out = FeatureStack::new();
        for name in names {
            let name = name.as_ref();
            let raster = self
                .band(name)
                .ok_or_else(|| Error::UnknownBand(name.to_string()))?;
            out.push_band(name, raster.clone())?;
        }
        Ok(out)
    }

    /// Band names in stack order
    pub fn names(&self) -> Vec<&str> {
        self.bands.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Band by name
    pub fn band(&self, name: &str) -> Option<&Raster<f64>> {
        self.bands.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// `(name, band)` pairs in stack order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Raster<f64>)> {
        self.bands.iter().map(|(n, r)| (n.as_str(), r))
    }

    pub fn into_bands(self) -> Vec<(String, Raster<f64>)> {
        self.bands
    }
}
