use ndarray::{Array2, Axis};
use num_complex::Complex;
use rustfft::FftPlanner;

use crate::error::Result;
use crate::frame::ensure_same_shape;

use super::subpixel::refine_peak_paraboloid;

/// Translation of a target grid relative to a reference grid.
///
/// Shifting the target by `(dy, dx)` (i.e. sampling it at `p - offset`)
/// lines it up with the reference.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AlignmentOffset {
    pub dx: f64,
    pub dy: f64,
}

/// Compute the translation offset between two grids using FFT phase correlation.
pub fn compute_offset_array(
    reference: &Array2<f32>,
    target: &Array2<f32>,
) -> Result<AlignmentOffset> {
    ensure_same_shape(reference.dim(), target.dim())?;
    let (h, w) = reference.dim();

    // Hann window against spectral leakage from the image borders
    let mut planner = FftPlanner::new();
    let ref_fft = fft2d(&apply_hann(reference), &mut planner, false);
    let tgt_fft = fft2d(&apply_hann(target), &mut planner, false);

    let cross_power = normalized_cross_power(&ref_fft, &tgt_fft);
    let correlation = fft2d(&cross_power, &mut planner, true).mapv(|c| c.re);

    let (peak_row, peak_col) = find_peak(&correlation);

    // Peaks past the midpoint are negative shifts (wrap-around)
    let dy = if peak_row > h / 2 {
        peak_row as f64 - h as f64
    } else {
        peak_row as f64
    };
    let dx = if peak_col > w / 2 {
        peak_col as f64 - w as f64
    } else {
        peak_col as f64
    };

    let (sub_dy, sub_dx) = refine_peak_paraboloid(&correlation, peak_row, peak_col);

    Ok(AlignmentOffset {
        dx: dx + sub_dx,
        dy: dy + sub_dy,
    })
}

fn apply_hann(data: &Array2<f32>) -> Array2<Complex<f64>> {
    let (h, w) = data.dim();
    let window = |i: usize, n: usize| 0.5 * (1.0 - (std::f64::consts::TAU * i as f64 / n as f64).cos());

    Array2::from_shape_fn((h, w), |(row, col)| {
        let v = data[[row, col]] as f64 * window(row, h) * window(col, w);
        Complex::new(v, 0.0)
    })
}

/// 2D (inverse) FFT as row-wise then column-wise 1D transforms.
///
/// The inverse transform is scaled by `1 / (h * w)`.
fn fft2d(
    data: &Array2<Complex<f64>>,
    planner: &mut FftPlanner<f64>,
    inverse: bool,
) -> Array2<Complex<f64>> {
    let (h, w) = data.dim();
    let mut work = data.clone();

    for (axis, len) in [(Axis(1), w), (Axis(0), h)] {
        let fft = if inverse {
            planner.plan_fft_inverse(len)
        } else {
            planner.plan_fft_forward(len)
        };
        let mut buffer = vec![Complex::new(0.0, 0.0); len];
        for mut lane in work.lanes_mut(axis) {
            for (b, v) in buffer.iter_mut().zip(lane.iter()) {
                *b = *v;
            }
            fft.process(&mut buffer);
            for (v, b) in lane.iter_mut().zip(buffer.iter()) {
                *v = *b;
            }
        }
    }

    if inverse {
        let scale = 1.0 / (h * w) as f64;
        work.mapv_inplace(|c| c * scale);
    }
    work
}

fn normalized_cross_power(
    ref_fft: &Array2<Complex<f64>>,
    tgt_fft: &Array2<Complex<f64>>,
) -> Array2<Complex<f64>> {
    let mut result = ref_fft.clone();
    result.zip_mut_with(tgt_fft, |r, t| {
        let cross = *r * t.conj();
        let mag = cross.norm();
        *r = if mag > 1e-12 {
            cross / mag
        } else {
            Complex::new(0.0, 0.0)
        };
    });
    result
}

fn find_peak(data: &Array2<f64>) -> (usize, usize) {
    let mut best = (0, 0);
    let mut best_val = f64::NEG_INFINITY;
    for ((row, col), &v) in data.indexed_iter() {
        if v > best_val {
            best_val = v;
            best = (row, col);
        }
    }
    best
}
