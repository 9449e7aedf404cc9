//! Reading and writing monthly composites and phenology bands
//!
//! Only single-band GeoTIFFs are supported: one file per month on input,
//! one file per feature band on output.

mod geotiff;

pub use geotiff::{
    read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer,
    GeoTiffOptions, GeoTiffReader,
};
