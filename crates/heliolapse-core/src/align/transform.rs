use ndarray::{Array2, Zip};
use serde::Serialize;

use super::rigid::RigidTransform;

/// Dense per-pixel displacement, one `(dy, dx)` vector per output pixel.
///
/// A displacement `u(p)` means output pixel `p` samples the moving grid at
/// `p + u(p)`.
#[derive(Clone, Debug)]
pub struct DisplacementField {
    pub dy: Array2<f32>,
    pub dx: Array2<f32>,
}

/// Magnitude statistics of a displacement field, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct DisplacementStats {
    pub mean: f64,
    pub max: f64,
    pub std_dev: f64,
}

impl std::fmt::Display for DisplacementStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "mean {:.4}, max {:.4}, std {:.4}",
            self.mean, self.max, self.std_dev
        )
    }
}

impl DisplacementField {
    pub fn zeros(shape: (usize, usize)) -> Self {
        Self {
            dy: Array2::zeros(shape),
            dx: Array2::zeros(shape),
        }
    }

    /// Shape as `(height, width)`.
    pub fn dim(&self) -> (usize, usize) {
        self.dy.dim()
    }

    /// Per-pixel vector length.
    pub fn magnitude(&self) -> Array2<f32> {
        Zip::from(&self.dy)
            .and(&self.dx)
            .map_collect(|&dy, &dx| (dy * dy + dx * dx).sqrt())
    }

    /// Mean, max and (population) standard deviation of the vector length.
    pub fn stats(&self) -> DisplacementStats {
        let magnitude = self.magnitude();
        let n = magnitude.len();
        if n == 0 {
            return DisplacementStats::default();
        }

        let mut sum = 0.0f64;
        let mut max = 0.0f64;
        for &m in magnitude.iter() {
            let m = m as f64;
            sum += m;
            max = max.max(m);
        }
        let mean = sum / n as f64;
        let var = magnitude
            .iter()
            .map(|&m| {
                let d = m as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n as f64;

        DisplacementStats {
            mean,
            max,
            std_dev: var.sqrt(),
        }
    }
}

/// Rigid transform composed with an optional dense displacement field.
///
/// The field is applied first (in reference-grid coordinates), then the
/// rigid transform carries the displaced point into the moving grid.
#[derive(Clone, Debug)]
pub struct Transform {
    pub rigid: RigidTransform,
    pub field: Option<DisplacementField>,
}

impl Transform {
    pub fn rigid_only(rigid: RigidTransform) -> Self {
        Self { rigid, field: None }
    }

    pub fn with_field(mut self, field: DisplacementField) -> Self {
        self.field = Some(field);
        self
    }

    /// Moving-grid coordinates sampled by output pixel `(row, col)`.
    pub fn map_pixel(&self, row: usize, col: usize) -> (f64, f64) {
        let (y, x) = match &self.field {
            Some(field) => (
                row as f64 + field.dy[[row, col]] as f64,
                col as f64 + field.dx[[row, col]] as f64,
            ),
            None => (row as f64, col as f64),
        };
        self.rigid.map_point(y, x)
    }
}
