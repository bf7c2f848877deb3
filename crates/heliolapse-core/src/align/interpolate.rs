use ndarray::Array2;

use crate::filters::gaussian_blur::fill_rows;

/// Bilinear sample at `(y, x)`; neighbours outside the grid read as `fill`.
pub fn bilinear_sample_fill(data: &Array2<f32>, y: f64, x: f64, fill: f32) -> f32 {
    let (h, w) = data.dim();

    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let x1 = x0 + 1;
    let y1 = y0 + 1;

    let fx = (x - x0 as f64) as f32;
    let fy = (y - y0 as f64) as f32;

    let sample = |r: i64, c: i64| -> f32 {
        if r >= 0 && r < h as i64 && c >= 0 && c < w as i64 {
            data[[r as usize, c as usize]]
        } else {
            fill
        }
    };

    let v00 = sample(y0, x0);
    let v10 = sample(y0, x1);
    let v01 = sample(y1, x0);
    let v11 = sample(y1, x1);

    v00 * (1.0 - fx) * (1.0 - fy) + v10 * fx * (1.0 - fy) + v01 * (1.0 - fx) * fy + v11 * fx * fy
}

/// Bilinear sample with zero fill outside the grid.
pub fn bilinear_sample(data: &Array2<f32>, y: f64, x: f64) -> f32 {
    bilinear_sample_fill(data, y, x, 0.0)
}

/// Bilinear sample with coordinates clamped to the grid (edge replicate).
pub fn bilinear_sample_clamped(data: &Array2<f32>, y: f64, x: f64) -> f32 {
    let (h, w) = data.dim();
    let y = y.clamp(0.0, (h - 1) as f64);
    let x = x.clamp(0.0, (w - 1) as f64);

    let y0 = y.floor() as usize;
    let x0 = x.floor() as usize;
    let y1 = (y0 + 1).min(h - 1);
    let x1 = (x0 + 1).min(w - 1);
    let fy = (y - y0 as f64) as f32;
    let fx = (x - x0 as f64) as f32;

    data[[y0, x0]] * (1.0 - fx) * (1.0 - fy)
        + data[[y0, x1]] * fx * (1.0 - fy)
        + data[[y1, x0]] * (1.0 - fx) * fy
        + data[[y1, x1]] * fx * fy
}

/// Resize to `(new_h, new_w)` with bilinear interpolation, pixel-centre aligned.
pub fn resize_bilinear(data: &Array2<f32>, new_h: usize, new_w: usize) -> Array2<f32> {
    let (h, w) = data.dim();
    if (h, w) == (new_h, new_w) {
        return data.clone();
    }
    let sy = h as f64 / new_h as f64;
    let sx = w as f64 / new_w as f64;

    let mut result = Array2::<f32>::zeros((new_h, new_w));
    fill_rows(&mut result, |row, out| {
        let y = (row as f64 + 0.5) * sy - 0.5;
        for (col, dst) in out.iter_mut().enumerate() {
            let x = (col as f64 + 0.5) * sx - 0.5;
            *dst = bilinear_sample_clamped(data, y, x);
        }
    });
    result
}
