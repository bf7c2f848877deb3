use std::path::Path;

use image::{ColorType, DynamicImage, ImageBuffer, ImageFormat, Luma};
use ndarray::Array2;

use crate::error::{HelioError, Result};
use crate::frame::{QuantizedFrame, RawFrame};

/// Load a raster image as a single-channel raw frame.
///
/// 16-bit sources keep their depth; colour images are reduced to luma.
pub fn load_png(path: &Path) -> Result<RawFrame> {
    let img = image::open(path)?;
    Ok(dynamic_to_raw(&img))
}

fn dynamic_to_raw(img: &DynamicImage) -> RawFrame {
    let (w, h) = (img.width() as usize, img.height() as usize);
    match img.color() {
        ColorType::L16 | ColorType::La16 | ColorType::Rgb16 | ColorType::Rgba16 => {
            let gray = img.to_luma16();
            let data = Array2::from_shape_fn((h, w), |(r, c)| {
                gray.get_pixel(c as u32, r as u32).0[0] as i64
            });
            RawFrame::integer(data, 16)
        }
        ColorType::Rgb32F | ColorType::Rgba32F => {
            let gray = img.to_luma32f();
            let data = Array2::from_shape_fn((h, w), |(r, c)| {
                gray.get_pixel(c as u32, r as u32).0[0] as f64
            });
            RawFrame::float(data, 32)
        }
        _ => {
            let gray = img.to_luma8();
            let data = Array2::from_shape_fn((h, w), |(r, c)| {
                gray.get_pixel(c as u32, r as u32).0[0] as i64
            });
            RawFrame::integer(data, 8)
        }
    }
}

/// Save a quantized frame as 16-bit grayscale PNG.
pub fn save_png16(frame: &QuantizedFrame, path: &Path) -> Result<()> {
    let (h, w) = frame.data.dim();
    let pixels: Vec<u16> = frame.data.iter().copied().collect();

    let img = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w as u32, h as u32, pixels)
        .ok_or(HelioError::InvalidDimensions {
            width: w,
            height: h,
        })?;
    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}
