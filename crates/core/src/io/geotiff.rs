//! Native GeoTIFF reading/writing
//!
//! Uses the `tiff` crate. Georeferencing is limited to the
//! ModelPixelScale + ModelTiepoint pair, which is what monthly composite
//! exports carry, plus the GDAL_NODATA ascii tag.

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use ndarray::Array2;
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tiff::decoder::{ChunkType, Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

/// Options for writing GeoTIFF files
#[derive(Debug, Clone, Default)]
pub struct GeoTiffOptions {
    /// Override the no-data value written to the GDAL_NODATA tag.
    /// When `None`, the raster's own no-data value is used.
    pub nodata: Option<f64>,
    /// Rows per strip; `None` keeps the encoder default (about 8 KiB per strip)
    pub rows_per_strip: Option<u32>,
}

/// Read a single-band GeoTIFF file into a Raster
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(BufReader::new(file))
}

/// Read a single-band GeoTIFF from an in-memory buffer
pub fn read_geotiff_from_buffer<T: RasterElement>(data: &[u8]) -> Result<Raster<T>> {
    decode_geotiff(Cursor::new(data))
}

fn tiff_err(what: &str, e: tiff::TiffError) -> Error {
    Error::Other(format!("{}: {}", what, e))
}

fn cast_all<S, T>(buf: Vec<S>) -> Vec<T>
where
    S: num_traits::NumCast + Copy,
    T: RasterElement,
{
    buf.into_iter()
        .map(|v| num_traits::cast(v).unwrap_or_else(T::default_nodata))
        .collect()
}

fn decoded_values<T: RasterElement>(result: DecodingResult) -> Result<Vec<T>> {
    Ok(match result {
        DecodingResult::F32(buf) => cast_all(buf),
        DecodingResult::F64(buf) => cast_all(buf),
        DecodingResult::U8(buf) => cast_all(buf),
        DecodingResult::U16(buf) => cast_all(buf),
        DecodingResult::U32(buf) => cast_all(buf),
        DecodingResult::I8(buf) => cast_all(buf),
        DecodingResult::I16(buf) => cast_all(buf),
        DecodingResult::I32(buf) => cast_all(buf),
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF pixel format".to_string(),
            ))
        }
    })
}

fn open_decoder<R: Read + Seek>(reader: R) -> Result<(Decoder<R>, usize, usize)> {
    let mut decoder =
        Decoder::new(reader).map_err(|e| tiff_err("TIFF decode error", e))?;
    let (width, height) = decoder
        .dimensions()
        .map_err(|e| tiff_err("Cannot read dimensions", e))?;
    Ok((decoder, height as usize, width as usize))
}

fn decode_geotiff<T, R>(reader: R) -> Result<Raster<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let (mut decoder, rows, cols) = open_decoder(reader)?;

    let data: Vec<T> = decoded_values(
        decoder
            .read_image()
            .map_err(|e| tiff_err("Cannot read image data", e))?,
    )?;

    // multi-sample images decode to rows * cols * samples values
    if data.len() != rows * cols {
        return Err(Error::UnsupportedDataType(format!(
            "expected a single-band image, got {} samples for {}x{} pixels",
            data.len(),
            cols,
            rows
        )));
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Some(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }
    raster.set_nodata(read_nodata(&mut decoder).and_then(num_traits::cast));

    Ok(raster)
}

fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok()?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }

    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let text = decoder.get_tag_ascii_string(Tag::GdalNodata).ok()?;
    text.trim_matches(char::from(0)).trim().parse().ok()
}

/// Windowed access to a single-band GeoTIFF on disk.
///
/// Opening reads only the header. Each [`read_window`](Self::read_window)
/// decodes just the strips or tiles overlapping the window, so a large
/// scene is never held in memory as a whole. The file is reopened per call,
/// which lets several threads read windows of the same file at once.
#[derive(Debug, Clone)]
pub struct GeoTiffReader {
    path: PathBuf,
    rows: usize,
    cols: usize,
    transform: GeoTransform,
    nodata: Option<f64>,
}

impl GeoTiffReader {
    /// Open `path` and read its dimensions, georeferencing and no-data tag
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (mut decoder, rows, cols) = open_decoder(BufReader::new(File::open(&path)?))?;

        Ok(Self {
            rows,
            cols,
            transform: read_geotransform(&mut decoder).unwrap_or_default(),
            nodata: read_nodata(&mut decoder),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// No-data value from the GDAL_NODATA tag
    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    /// Replace the no-data value reported for this file
    pub fn set_nodata(&mut self, nodata: Option<f64>) {
        self.nodata = nodata;
    }

    /// Decode the `rows x cols` window whose top-left cell is (`row`, `col`)
    pub fn read_window<T: RasterElement>(
        &self,
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    ) -> Result<Array2<T>> {
        if row + rows > self.rows || col + cols > self.cols {
            return Err(Error::IndexOutOfBounds {
                row: row + rows,
                col: col + cols,
                rows: self.rows,
                cols: self.cols,
            });
        }

        let mut out = Array2::from_elem((rows, cols), T::default_nodata());
        if rows == 0 || cols == 0 {
            return Ok(out);
        }

        let (mut decoder, _, _) = open_decoder(BufReader::new(File::open(&self.path)?))?;
        let (chunk_w, chunk_h) = decoder.chunk_dimensions();
        let (chunk_w, chunk_h) = (chunk_w as usize, chunk_h as usize);
        if chunk_w == 0 || chunk_h == 0 {
            return Err(Error::UnsupportedDataType(format!(
                "invalid chunk size {}x{}",
                chunk_w, chunk_h
            )));
        }
        let chunks_across = match decoder.get_chunk_type() {
            ChunkType::Strip => 1,
            ChunkType::Tile => (self.cols + chunk_w - 1) / chunk_w,
        };

        for chunk_row in row / chunk_h..=(row + rows - 1) / chunk_h {
            for chunk_col in col / chunk_w..=(col + cols - 1) / chunk_w {
                let index = (chunk_row * chunks_across + chunk_col) as u32;
                let (data_w, data_h) = decoder.chunk_data_dimensions(index);
                let (data_w, data_h) = (data_w as usize, data_h as usize);

                let values: Vec<T> = decoded_values(
                    decoder
                        .read_chunk(index)
                        .map_err(|e| tiff_err("Cannot read image chunk", e))?,
                )?;
                if values.len() != data_w * data_h {
                    return Err(Error::UnsupportedDataType(format!(
                        "expected a single-band image, got {} samples for a {}x{} chunk",
                        values.len(),
                        data_w,
                        data_h
                    )));
                }

                // overlap of the chunk and the window, in image coordinates
                let top = chunk_row * chunk_h;
                let left = chunk_col * chunk_w;
                let r0 = row.max(top);
                let r1 = (row + rows).min(top + data_h);
                let c0 = col.max(left);
                let c1 = (col + cols).min(left + data_w);

                for r in r0..r1 {
                    for c in c0..c1 {
                        out[(r - row, c - col)] = values[(r - top) * data_w + (c - left)];
                    }
                }
            }
        }

        Ok(out)
    }
}

/// Write a Raster to a GeoTIFF file as 32-bit float
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: Option<GeoTiffOptions>) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    encode_geotiff(raster, &mut writer, options.unwrap_or_default())?;
    writer.flush()?;
    Ok(())
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T: RasterElement>(
    raster: &Raster<T>,
    options: Option<GeoTiffOptions>,
) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf), options.unwrap_or_default())?;
    Ok(buf)
}

fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W, options: GeoTiffOptions) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let mut encoder = TiffEncoder::new(writer).map_err(|e| tiff_err("TIFF encoder error", e))?;

    let (rows, cols) = raster.shape();
    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
        .collect();

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(|e| tiff_err("Cannot create TIFF image", e))?;

    if let Some(rps) = options.rows_per_strip {
        image
            .rows_per_strip(rps.max(1))
            .map_err(|e| tiff_err("Cannot set rows per strip", e))?;
    }

    let gt = raster.transform();
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &scale[..])
        .map_err(|e| tiff_err("Cannot write scale tag", e))?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, &tiepoint[..])
        .map_err(|e| tiff_err("Cannot write tiepoint tag", e))?;

    // Version 1.1.0 with two keys: projected model, pixel-is-area
    let geokeys: [u16; 12] = [1, 1, 0, 2, 1024, 0, 1, 1, 1025, 0, 1, 1];
    image
        .encoder()
        .write_tag(Tag::GeoKeyDirectoryTag, &geokeys[..])
        .map_err(|e| tiff_err("Cannot write geokey tag", e))?;

    let nodata = options.nodata.or_else(|| raster.nodata().and_then(|v| v.to_f64()));
    if let Some(nd) = nodata {
        let text = if nd.is_nan() { "nan".to_string() } else { nd.to_string() };
        image
            .encoder()
            .write_tag(Tag::GdalNodata, text.as_str())
            .map_err(|e| tiff_err("Cannot write nodata tag", e))?;
    }

    image
        .write_data(&data)
        .map_err(|e| tiff_err("Cannot write image data", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> Raster<f64> {
        let mut r = Raster::from_vec(vec![0.1, 0.25, f64::NAN, 0.8, -0.05, 0.6], 2, 3).unwrap();
        r.set_transform(GeoTransform::new(300_000.0, 5_000_000.0, 10.0, -10.0));
        r.set_nodata(Some(f64::NAN));
        r
    }

    fn gradient(rows: usize, cols: usize) -> Raster<f64> {
        let data = (0..rows * cols).map(|i| i as f64).collect();
        let mut r = Raster::from_vec(data, rows, cols).unwrap();
        r.set_transform(GeoTransform::new(500.0, 900.0, 2.0, -2.0));
        r
    }

    #[test]
    fn test_buffer_roundtrip_keeps_values_and_grid() {
        let raster = sample();
        let bytes = write_geotiff_to_buffer(&raster, None).unwrap();
        let back: Raster<f64> = read_geotiff_from_buffer(&bytes).unwrap();

        assert_eq!(back.shape(), (2, 3));
        assert_eq!(*back.transform(), *raster.transform());
        assert_relative_eq!(back.get(0, 1).unwrap(), 0.25, epsilon = 1e-6);
        assert_relative_eq!(back.get(1, 0).unwrap(), 0.8, epsilon = 1e-6);
        assert!(back.get(0, 2).unwrap().is_nan());
        assert!(back.nodata().map_or(false, |v| v.is_nan()));
    }

    #[test]
    fn test_explicit_nodata_tag() {
        let mut raster = sample();
        raster.set_nodata(None);
        let bytes = write_geotiff_to_buffer(
            &raster,
            Some(GeoTiffOptions {
                nodata: Some(-9999.0),
                ..Default::default()
            }),
        )
        .unwrap();
        let back: Raster<f64> = read_geotiff_from_buffer(&bytes).unwrap();
        assert_eq!(back.nodata(), Some(-9999.0));
    }

    #[test]
    fn test_untagged_file_has_no_nodata() {
        let mut raster = gradient(2, 2);
        raster.set_nodata(None);
        let bytes = write_geotiff_to_buffer(&raster, None).unwrap();
        let back: Raster<f64> = read_geotiff_from_buffer(&bytes).unwrap();
        assert_eq!(back.nodata(), None);
        assert_eq!(back.transform().origin_x, 500.0);
    }

    #[test]
    fn test_garbage_is_rejected() {
        let result: Result<Raster<f64>> = read_geotiff_from_buffer(b"not a tiff");
        assert!(result.is_err());
    }

    #[test]
    fn test_reader_windows_across_strips() {
        let raster = gradient(23, 17);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strips.tif");
        write_geotiff(
            &raster,
            &path,
            Some(GeoTiffOptions {
                nodata: Some(-1.0),
                rows_per_strip: Some(4),
            }),
        )
        .unwrap();

        let reader = GeoTiffReader::open(&path).unwrap();
        assert_eq!(reader.shape(), (23, 17));
        assert_eq!(*reader.transform(), *raster.transform());
        assert_eq!(reader.nodata(), Some(-1.0));

        // spans strips 1..=4 and the partial last column range
        let window: Array2<f64> = reader.read_window(6, 9, 11, 8).unwrap();
        assert_eq!(window.dim(), (11, 8));
        for r in 0..11 {
            for c in 0..8 {
                assert_eq!(window[(r, c)], raster.get(6 + r, 9 + c).unwrap());
            }
        }

        // last, shorter strip
        let tail: Array2<f64> = reader.read_window(20, 0, 3, 17).unwrap();
        assert_eq!(tail[(2, 16)], (22 * 17 + 16) as f64);

        assert!(matches!(
            reader.read_window::<f64>(20, 0, 4, 17),
            Err(Error::IndexOutOfBounds { .. })
        ));
    }
}
