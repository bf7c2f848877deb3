//! Demons deformable registration.
//!
//! Each iteration warps the moving grid through the current displacement
//! field, turns the residual `fixed - warped` into a per-pixel force along
//! the intensity gradient and adds it to the field, then smooths the whole
//! field with a Gaussian. The force is normalized as
//! `residual * g / (|g|^2 + residual^2)`, which caps a single update at
//! half a pixel.
//!
//! In pyramid mode the same relaxation runs on block-averaged copies of both
//! grids (factors 4, 2, 1); each level starts from the upsampled field of
//! the level before it.

use ndarray::{Array2, Zip};
use tracing::{debug, info};

use crate::align::interpolate::bilinear_sample;
use crate::align::transform::{DisplacementField, DisplacementStats};
use crate::consts::{DEMONS_DENOMINATOR_THRESHOLD, PARALLEL_PIXEL_THRESHOLD, PYRAMID_FACTORS};
use crate::error::{HelioError, Result};
use crate::filters::gaussian_blur::{fill_rows, gaussian_blur_array};
use crate::frame::{ensure_same_shape, ensure_usable_shape};
use crate::pipeline::config::{DemonsForce, RegistrationConfig, RegistrationMode};
use crate::pipeline::CancelFlag;

use super::pyramid::{downsample, level_shape, split_iterations, upsample_field};

/// Output of the deformable stage.
#[derive(Clone, Debug)]
pub struct Registration {
    pub field: DisplacementField,
    pub stats: DisplacementStats,
}

/// Estimate the displacement field that warps `moving` onto `fixed`.
///
/// Both grids must share a shape; the field has that shape too.
pub fn register(
    fixed: &Array2<f32>,
    moving: &Array2<f32>,
    config: &RegistrationConfig,
    cancel: &CancelFlag,
) -> Result<Registration> {
    ensure_same_shape(fixed.dim(), moving.dim())?;
    let (h, w) = fixed.dim();
    ensure_usable_shape(h, w)?;

    let field = match config.mode {
        RegistrationMode::SingleResolution => run_demons(
            fixed,
            moving,
            DisplacementField::zeros((h, w)),
            config.iterations,
            config.std_dev,
            config.force,
            cancel,
        )?,
        RegistrationMode::MultiResolution => register_pyramid(fixed, moving, config, cancel)?,
    };

    let stats = field.stats();
    if let Some(fraction) = config.max_displacement_fraction {
        let bound = fraction as f64 * ((h * h + w * w) as f64).sqrt();
        if stats.max > bound {
            return Err(HelioError::Divergence {
                max: stats.max,
                bound,
            });
        }
    }

    Ok(Registration { field, stats })
}

fn register_pyramid(
    fixed: &Array2<f32>,
    moving: &Array2<f32>,
    config: &RegistrationConfig,
    cancel: &CancelFlag,
) -> Result<DisplacementField> {
    let shape = fixed.dim();
    let budget = split_iterations(config.iterations);

    let mut field: Option<(DisplacementField, usize)> = None;
    let mut carried = 0;

    for (&factor, &level_iterations) in PYRAMID_FACTORS.iter().zip(budget.iter()) {
        let iterations = level_iterations + carried;
        let (lh, lw) = level_shape(shape, factor);
        if ensure_usable_shape(lh, lw).is_err() {
            // Too small to register at this level; hand its budget down.
            debug!(factor, "Skipping pyramid level");
            carried = iterations;
            continue;
        }
        carried = 0;

        let initial = match &field {
            Some((coarse, coarse_factor)) => {
                upsample_field(coarse, (lh, lw), *coarse_factor as f64 / factor as f64)
            }
            None => DisplacementField::zeros((lh, lw)),
        };

        let level_field = if iterations == 0 {
            initial
        } else {
            let fixed_level = downsample(fixed, factor);
            let moving_level = downsample(moving, factor);
            debug!(factor, iterations, width = lw, height = lh, "Pyramid level");
            run_demons(
                &fixed_level,
                &moving_level,
                initial,
                iterations,
                config.std_dev,
                config.force,
                cancel,
            )?
        };
        field = Some((level_field, factor));
    }

    Ok(match field {
        Some((f, 1)) => f,
        Some((f, factor)) => upsample_field(&f, shape, factor as f64),
        None => DisplacementField::zeros(shape),
    })
}

/// Run `iterations` demons updates starting from `field`.
fn run_demons(
    fixed: &Array2<f32>,
    moving: &Array2<f32>,
    mut field: DisplacementField,
    iterations: usize,
    sigma: f32,
    force: DemonsForce,
    cancel: &CancelFlag,
) -> Result<DisplacementField> {
    let (h, w) = fixed.dim();
    let (fixed_gy, fixed_gx) = gradient(fixed);
    let parallel = h * w >= PARALLEL_PIXEL_THRESHOLD;

    for iteration in 0..iterations {
        if cancel.is_cancelled() {
            return Err(HelioError::Cancelled);
        }

        let warped = warp(moving, &field);
        let warped_gradient = match force {
            DemonsForce::Symmetric => Some(gradient(&warped)),
            DemonsForce::Fixed => None,
        };

        let step = |(r, c): (usize, usize), uy: &mut f32, ux: &mut f32| {
            let diff = fixed[[r, c]] - warped[[r, c]];
            let (mut gy, mut gx) = (fixed_gy[[r, c]], fixed_gx[[r, c]]);
            if let Some((wgy, wgx)) = &warped_gradient {
                gy = 0.5 * (gy + wgy[[r, c]]);
                gx = 0.5 * (gx + wgx[[r, c]]);
            }
            let denom = gy * gy + gx * gx + diff * diff;
            if denom >= DEMONS_DENOMINATOR_THRESHOLD {
                *uy += diff * gy / denom;
                *ux += diff * gx / denom;
            }
        };

        let zip = Zip::indexed(&mut field.dy).and(&mut field.dx);
        if parallel {
            zip.par_for_each(step);
        } else {
            zip.for_each(step);
        }

        field.dy = gaussian_blur_array(&field.dy, sigma);
        field.dx = gaussian_blur_array(&field.dx, sigma);

        if iteration + 1 == iterations {
            info!(
                iterations,
                width = w,
                height = h,
                mean_residual = mean_abs_diff(fixed, &warped),
                "Demons pass finished"
            );
        }
    }

    Ok(field)
}

/// Sample `moving` at `p + u(p)` for every pixel `p`.
fn warp(moving: &Array2<f32>, field: &DisplacementField) -> Array2<f32> {
    let mut result = Array2::<f32>::zeros(field.dim());
    fill_rows(&mut result, |row, out| {
        for (col, dst) in out.iter_mut().enumerate() {
            let y = row as f64 + field.dy[[row, col]] as f64;
            let x = col as f64 + field.dx[[row, col]] as f64;
            *dst = bilinear_sample(moving, y, x);
        }
    });
    result
}

/// Central-difference gradient `(d/dy, d/dx)`, edges clamped.
fn gradient(data: &Array2<f32>) -> (Array2<f32>, Array2<f32>) {
    let (h, w) = data.dim();
    let gy = Array2::from_shape_fn((h, w), |(r, c)| {
        0.5 * (data[[(r + 1).min(h - 1), c]] - data[[r.saturating_sub(1), c]])
    });
    let gx = Array2::from_shape_fn((h, w), |(r, c)| {
        0.5 * (data[[r, (c + 1).min(w - 1)]] - data[[r, c.saturating_sub(1)]])
    });
    (gy, gx)
}

fn mean_abs_diff(a: &Array2<f32>, b: &Array2<f32>) -> f64 {
    let n = a.len().max(1) as f64;
    Zip::from(a)
        .and(b)
        .fold(0.0f64, |acc, &x, &y| acc + (x - y).abs() as f64)
        / n
}
