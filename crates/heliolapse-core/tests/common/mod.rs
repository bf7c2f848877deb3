#![allow(dead_code)]

use std::path::{Path, PathBuf};

use ndarray::Array2;

use heliolapse_core::filters::histogram::levels_u16;
use heliolapse_core::frame::QuantizedFrame;
use heliolapse_core::io::image_io::save_png16;

/// Synthetic solar disk: limb-darkened disk of `radius` centred at
/// `(cy, cx)` with a few soft spots so every region has texture.
pub fn solar_disk(h: usize, w: usize, cy: f64, cx: f64, radius: f64) -> Array2<f32> {
    let spots = [(-0.35, 0.2, 0.12), (0.25, -0.3, 0.09), (0.1, 0.4, 0.07)];
    Array2::from_shape_fn((h, w), |(r, c)| {
        let dy = r as f64 - cy;
        let dx = c as f64 - cx;
        let d = (dy * dy + dx * dx).sqrt() / radius;
        // Smooth limb over about one pixel.
        let edge = 1.0 / (1.0 + ((d - 1.0) * radius).exp());
        let limb = (1.0 - 0.6 * d.min(1.0).powi(2)).max(0.0);
        let mut v = 0.05 + 0.9 * edge * limb;
        for &(sy, sx, sr) in &spots {
            let py = dy / radius - sy;
            let px = dx / radius - sx;
            v -= 0.3 * edge * (-(py * py + px * px) / (2.0 * sr * sr)).exp();
        }
        v as f32
    })
}

/// Smooth isolated Gaussian blob.
pub fn gaussian_blob(h: usize, w: usize, cy: f64, cx: f64, sigma: f64) -> Array2<f32> {
    Array2::from_shape_fn((h, w), |(r, c)| {
        let dy = r as f64 - cy;
        let dx = c as f64 - cx;
        (-(dy * dy + dx * dx) / (2.0 * sigma * sigma)).exp() as f32
    })
}

/// Write a [0, 1] grid as a 16-bit PNG named `name` in `dir`.
pub fn write_png_frame(dir: &Path, name: &str, data: &Array2<f32>) -> PathBuf {
    let path = dir.join(name);
    save_png16(&QuantizedFrame::new(levels_u16(data)), &path).expect("write png");
    path
}

/// Write a file with a frame extension but undecodable contents.
pub fn write_corrupt_frame(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"definitely not an image").expect("write corrupt frame");
    path
}

pub fn mean_abs_diff(a: &Array2<f32>, b: &Array2<f32>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x - y).abs() as f64)
        .sum::<f64>()
        / a.len() as f64
}
