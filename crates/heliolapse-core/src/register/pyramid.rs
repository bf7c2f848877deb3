//! Resolution pyramid helpers for coarse-to-fine registration.

use ndarray::Array2;

use crate::align::interpolate::bilinear_sample_clamped;
use crate::align::transform::DisplacementField;
use crate::consts::PYRAMID_BUDGET_PERCENT;
use crate::filters::gaussian_blur::fill_rows;

/// Split `total` iterations over the pyramid levels, coarsest first.
///
/// Every level but the finest gets its floored share; the finest takes the
/// remainder, so the parts always sum to `total`.
pub fn split_iterations(total: usize) -> [usize; 3] {
    let mut parts = [0usize; 3];
    let last = parts.len() - 1;
    let mut assigned = 0;
    for (part, &percent) in parts.iter_mut().zip(PYRAMID_BUDGET_PERCENT.iter()).take(last) {
        *part = total * percent / 100;
        assigned += *part;
    }
    parts[last] = total - assigned;
    parts
}

/// Shape of a grid downsampled by `factor` (floored, at least 1x1).
pub fn level_shape((h, w): (usize, usize), factor: usize) -> (usize, usize) {
    ((h / factor).max(1), (w / factor).max(1))
}

/// Downsample by averaging `factor x factor` blocks.
///
/// Trailing rows/columns that do not fill a whole block are dropped.
pub fn downsample(data: &Array2<f32>, factor: usize) -> Array2<f32> {
    if factor <= 1 {
        return data.clone();
    }
    let (h, w) = data.dim();
    let (new_h, new_w) = level_shape((h, w), factor);
    let bh = factor.min(h);
    let bw = factor.min(w);
    let norm = 1.0 / (bh * bw) as f32;

    let mut result = Array2::<f32>::zeros((new_h, new_w));
    fill_rows(&mut result, |row, out| {
        for (col, dst) in out.iter_mut().enumerate() {
            let mut sum = 0.0f32;
            for r in row * factor..row * factor + bh {
                for c in col * factor..col * factor + bw {
                    sum += data[[r, c]];
                }
            }
            *dst = sum * norm;
        }
    });
    result
}

/// Resample a coarse field onto a finer grid of `shape`.
///
/// `scale` is the resolution ratio between the two grids; vectors are
/// stretched by the same ratio.
pub fn upsample_field(
    field: &DisplacementField,
    shape: (usize, usize),
    scale: f64,
) -> DisplacementField {
    if field.dim() == shape && scale == 1.0 {
        return field.clone();
    }

    let upsample = |component: &Array2<f32>| {
        let mut result = Array2::<f32>::zeros(shape);
        fill_rows(&mut result, |row, out| {
            let y = (row as f64 + 0.5) / scale - 0.5;
            for (col, dst) in out.iter_mut().enumerate() {
                let x = (col as f64 + 0.5) / scale - 0.5;
                *dst = bilinear_sample_clamped(component, y, x) * scale as f32;
            }
        });
        result
    };

    DisplacementField {
        dy: upsample(&field.dy),
        dx: upsample(&field.dx),
    }
}
