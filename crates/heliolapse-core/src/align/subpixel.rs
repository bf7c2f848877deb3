use ndarray::Array2;

/// Refine a correlation peak with 1D parabola fits along each axis.
///
/// Returns `(delta_row, delta_col)` relative to the integer peak, clamped to
/// half a pixel. Peaks on the border are not refined.
pub fn refine_peak_paraboloid(
    correlation: &Array2<f64>,
    peak_row: usize,
    peak_col: usize,
) -> (f64, f64) {
    let (h, w) = correlation.dim();
    if peak_row == 0 || peak_row + 1 >= h || peak_col == 0 || peak_col + 1 >= w {
        return (0.0, 0.0);
    }

    let vertex = |prev: f64, curr: f64, next: f64| -> f64 {
        let curvature = prev - 2.0 * curr + next;
        if curvature.abs() > 1e-12 {
            ((prev - next) / (2.0 * curvature)).clamp(-0.5, 0.5)
        } else {
            0.0
        }
    };

    let c = correlation[[peak_row, peak_col]];
    let delta_row = vertex(
        correlation[[peak_row - 1, peak_col]],
        c,
        correlation[[peak_row + 1, peak_col]],
    );
    let delta_col = vertex(
        correlation[[peak_row, peak_col - 1]],
        c,
        correlation[[peak_row, peak_col + 1]],
    );

    (delta_row, delta_col)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_peak_has_no_offset() {
        let mut c = Array2::<f64>::zeros((5, 5));
        c[[2, 2]] = 1.0;
        c[[1, 2]] = 0.5;
        c[[3, 2]] = 0.5;
        c[[2, 1]] = 0.5;
        c[[2, 3]] = 0.5;
        let (dr, dc) = refine_peak_paraboloid(&c, 2, 2);
        assert!(dr.abs() < 1e-9 && dc.abs() < 1e-9);
    }

    #[test]
    fn border_peak_is_not_refined() {
        let c = Array2::<f64>::ones((4, 4));
        assert_eq!(refine_peak_paraboloid(&c, 0, 2), (0.0, 0.0));
    }
}
