//! Rigid (similarity) pre-alignment.
//!
//! The moving frame is first brought into the reference coordinate system by
//! putting the geometric centres of both grids in correspondence with zero
//! rotation. Optionally the residual translation is then measured with
//! phase correlation and folded into the transform.

use ndarray::Array2;
use tracing::debug;

use crate::error::Result;
use crate::filters::gaussian_blur::fill_rows;
use crate::frame::{ensure_usable_shape, Frame};
use crate::pipeline::config::RigidConfig;

use super::interpolate::{bilinear_sample, resize_bilinear};
use super::phase_correlation::compute_offset_array;

/// Rotation about `center` followed by a translation.
///
/// Maps reference-grid coordinates to moving-grid coordinates:
/// `p_moving = R(angle) * (p - center) + center + translation`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RigidTransform {
    /// Rotation angle in radians.
    pub angle: f64,
    pub translation_y: f64,
    pub translation_x: f64,
    pub center_y: f64,
    pub center_x: f64,
}

impl RigidTransform {
    /// Identity transform rotating about `(center_y, center_x)`.
    pub fn identity(center_y: f64, center_x: f64) -> Self {
        Self {
            angle: 0.0,
            translation_y: 0.0,
            translation_x: 0.0,
            center_y,
            center_x,
        }
    }

    /// Geometric-centre initializer for grids of shape `fixed` and `moving`
    /// (both `(h, w)`).
    pub fn centered(fixed: (usize, usize), moving: (usize, usize)) -> Self {
        let (fy, fx) = geometric_center(fixed);
        let (my, mx) = geometric_center(moving);
        Self {
            translation_y: my - fy,
            translation_x: mx - fx,
            ..Self::identity(fy, fx)
        }
    }

    /// Map a reference-grid point to the moving grid.
    pub fn map_point(&self, y: f64, x: f64) -> (f64, f64) {
        let (sin, cos) = self.angle.sin_cos();
        let dy = y - self.center_y;
        let dx = x - self.center_x;
        let my = sin * dx + cos * dy + self.center_y + self.translation_y;
        let mx = cos * dx - sin * dy + self.center_x + self.translation_x;
        (my, mx)
    }

    pub fn is_identity(&self) -> bool {
        self.angle == 0.0 && self.translation_y == 0.0 && self.translation_x == 0.0
    }
}

/// Centre of a grid's extent, `((h - 1) / 2, (w - 1) / 2)`.
fn geometric_center((h, w): (usize, usize)) -> (f64, f64) {
    ((h as f64 - 1.0) / 2.0, (w as f64 - 1.0) / 2.0)
}

/// Estimate the rigid transform bringing `moving` onto `fixed`.
pub fn estimate_rigid(fixed: &Frame, moving: &Frame, config: &RigidConfig) -> Result<RigidTransform> {
    let (fh, fw) = fixed.data.dim();
    let (mh, mw) = moving.data.dim();
    ensure_usable_shape(fh, fw)?;
    ensure_usable_shape(mh, mw)?;

    let mut transform = RigidTransform::centered((fh, fw), (mh, mw));

    if config.refine_translation {
        let initialized = apply_rigid(&moving.data, &transform, (fh, fw));
        let offset = compute_offset_array(&fixed.data, &initialized)?;
        transform.translation_y -= offset.dy;
        transform.translation_x -= offset.dx;
        debug!(
            dy = transform.translation_y,
            dx = transform.translation_x,
            "Rigid translation refined"
        );
    }

    Ok(transform)
}

/// Resample `moving` onto a grid of `shape` through `transform`.
///
/// Linear interpolation; samples outside the moving grid are 0.
pub fn apply_rigid(
    moving: &Array2<f32>,
    transform: &RigidTransform,
    shape: (usize, usize),
) -> Array2<f32> {
    let mut result = Array2::<f32>::zeros(shape);
    fill_rows(&mut result, |row, out| {
        for (col, dst) in out.iter_mut().enumerate() {
            let (y, x) = transform.map_point(row as f64, col as f64);
            *dst = bilinear_sample(moving, y, x);
        }
    });
    result
}

/// Estimate and apply the rigid transform in one step.
///
/// The returned frame always has `fixed`'s shape.
pub fn pre_align(
    fixed: &Frame,
    moving: &Frame,
    config: &RigidConfig,
) -> Result<(RigidTransform, Frame)> {
    let transform = estimate_rigid(fixed, moving, config)?;
    let (h, w) = fixed.data.dim();

    let mut data = apply_rigid(&moving.data, &transform, (h, w));
    if data.dim() != (h, w) {
        data = resize_bilinear(&data, h, w);
    }

    Ok((transform, Frame::new(data, moving.original_bit_depth)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_transform_maps_center_to_center() {
        let t = RigidTransform::centered((10, 20), (30, 40));
        let (y, x) = t.map_point(4.5, 9.5);
        assert!((y - 14.5).abs() < 1e-12);
        assert!((x - 19.5).abs() < 1e-12);
    }

    #[test]
    fn quarter_turn_rotates_about_center() {
        let t = RigidTransform {
            angle: std::f64::consts::FRAC_PI_2,
            ..RigidTransform::identity(0.0, 0.0)
        };
        let (y, x) = t.map_point(0.0, 1.0);
        assert!((y - 1.0).abs() < 1e-12);
        assert!(x.abs() < 1e-12);
    }
}
