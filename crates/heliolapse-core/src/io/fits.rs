use std::path::Path;

use fitrs::{Fits, FitsData, HeaderValue, Hdu};
use ndarray::Array2;

use crate::error::{HelioError, Result};
use crate::frame::{QuantizedFrame, RawFrame};

/// Load the first 2-D (or single-plane 3-D) image HDU of a FITS file.
///
/// Integer data keeps its sign and range. An integer array with BLANK
/// samples is returned on the float path with those samples set to NaN.
pub fn load_fits(path: &Path) -> Result<RawFrame> {
    let fits = Fits::open(path)?;

    for hdu in fits.iter() {
        let bit_depth = bitpix(&hdu).map(|b| b.unsigned_abs() as u8).unwrap_or(32);
        let frame = match hdu.read_data() {
            FitsData::FloatingPoint32(d) if is_mono_shape(&d.shape) => {
                float_grid(d.shape[0], d.shape[1], &d.data, |v| v as f64)
                    .map(|g| RawFrame::float(g, 32))
            }
            FitsData::FloatingPoint64(d) if is_mono_shape(&d.shape) => {
                float_grid(d.shape[0], d.shape[1], &d.data, |v| v)
                    .map(|g| RawFrame::float(g, 64))
            }
            FitsData::IntegersI32(d) if is_mono_shape(&d.shape) => {
                integer_frame(d.shape[0], d.shape[1], &d.data, bit_depth, |v| v as i64)
            }
            FitsData::IntegersU32(d) if is_mono_shape(&d.shape) => {
                integer_frame(d.shape[0], d.shape[1], &d.data, bit_depth, |v| v as i64)
            }
            _ => None,
        };

        if let Some(frame) = frame {
            return Ok(frame);
        }
    }

    Err(HelioError::InvalidFits {
        path: path.to_path_buf(),
        reason: "no single-plane image HDU".into(),
    })
}

/// Write a quantized frame as a primary HDU of 32-bit floats.
pub fn save_fits(frame: &QuantizedFrame, path: &Path) -> Result<()> {
    let (h, w) = frame.data.dim();
    if h == 0 || w == 0 {
        return Err(HelioError::InvalidDimensions {
            width: w,
            height: h,
        });
    }
    let data: Vec<f32> = frame.data.iter().map(|&v| v as f32).collect();
    let hdu = Hdu::new(&[w, h], data);
    // fitrs refuses to overwrite an existing file.
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Fits::create(path, hdu)?;
    Ok(())
}

fn is_mono_shape(shape: &[usize]) -> bool {
    shape.len() == 2 || (shape.len() == 3 && shape[2] == 1)
}

fn bitpix(hdu: &Hdu) -> Option<i32> {
    match hdu.value("BITPIX") {
        Some(HeaderValue::IntegerNumber(v)) => Some(*v as i32),
        _ => None,
    }
}

fn float_grid<T: Copy>(
    width: usize,
    height: usize,
    data: &[T],
    cvt: fn(T) -> f64,
) -> Option<Array2<f64>> {
    if width == 0 || height == 0 || data.len() != width * height {
        return None;
    }
    Some(Array2::from_shape_fn((height, width), |(r, c)| {
        cvt(data[r * width + c])
    }))
}

fn integer_frame<T: Copy>(
    width: usize,
    height: usize,
    data: &[Option<T>],
    bit_depth: u8,
    cvt: fn(T) -> i64,
) -> Option<RawFrame> {
    if width == 0 || height == 0 || data.len() != width * height {
        return None;
    }
    if data.iter().any(Option::is_none) {
        let grid = Array2::from_shape_fn((height, width), |(r, c)| {
            data[r * width + c].map_or(f64::NAN, |v| cvt(v) as f64)
        });
        return Some(RawFrame::float(grid, bit_depth));
    }
    let grid = Array2::from_shape_fn((height, width), |(r, c)| {
        data[r * width + c].map_or(0, cvt)
    });
    Some(RawFrame::integer(grid, bit_depth))
}
