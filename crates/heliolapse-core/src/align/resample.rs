use ndarray::Array2;

use crate::consts::U16_MAX_F32;
use crate::error::Result;
use crate::filters::gaussian_blur::fill_rows;
use crate::filters::histogram::HistogramMapping;
use crate::frame::{ensure_same_shape, Frame, QuantizedFrame};

use super::interpolate::{bilinear_sample, resize_bilinear};
use super::transform::Transform;

/// Resample `moving` onto a grid of `shape` through the composed transform.
///
/// Linear interpolation, 0 outside the moving grid.
pub fn resample(
    moving: &Array2<f32>,
    transform: &Transform,
    shape: (usize, usize),
) -> Result<Array2<f32>> {
    if let Some(field) = &transform.field {
        ensure_same_shape(shape, field.dim())?;
    }

    let mut result = Array2::<f32>::zeros(shape);
    fill_rows(&mut result, |row, out| {
        for (col, dst) in out.iter_mut().enumerate() {
            let (y, x) = transform.map_pixel(row, col);
            *dst = bilinear_sample(moving, y, x);
        }
    });
    Ok(result)
}

/// Stretch the observed min/max of `data` to the full 16-bit range.
///
/// A flat grid quantizes to all zeros.
pub fn quantize_u16(data: &Array2<f32>) -> Array2<u16> {
    let (min, max) = data
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    let range = max - min;
    if range <= 0.0 || !range.is_finite() {
        return Array2::<u16>::zeros(data.dim());
    }

    data.mapv(|v| (((v - min) / range) * U16_MAX_F32).round().clamp(0.0, U16_MAX_F32) as u16)
}

/// Resample a normalized moving frame onto the reference grid and quantize.
///
/// When `mapping` is given, resampled intensities are sent through it
/// before quantization so the output carries the reference's histogram.
pub fn resample_and_quantize(
    moving: &Frame,
    transform: &Transform,
    mapping: Option<&HistogramMapping>,
    reference_shape: (usize, usize),
) -> Result<QuantizedFrame> {
    let mut sampled = resample(&moving.data, transform, reference_shape)?;
    if let Some(mapping) = mapping {
        sampled.mapv_inplace(|v| mapping.map_normalized(v));
    }

    if sampled.dim() != reference_shape {
        sampled = resize_bilinear(&sampled, reference_shape.0, reference_shape.1);
    }

    Ok(QuantizedFrame::new(quantize_u16(&sampled)))
}
