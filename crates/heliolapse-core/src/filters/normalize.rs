use ndarray::Array2;
use num_traits::AsPrimitive;

use crate::error::{HelioError, Result};
use crate::frame::{Frame, RawFrame, RawSamples};

/// Normalize a decoded frame into [0.0, 1.0].
///
/// Non-finite samples become 0 before the range is measured. A constant
/// frame normalizes to all zeros.
pub fn normalize(raw: &RawFrame) -> Result<Frame> {
    let (h, w) = raw.dim();
    if h == 0 || w == 0 {
        return Err(HelioError::InvalidDimensions {
            width: w,
            height: h,
        });
    }

    let data = match &raw.samples {
        RawSamples::Integer(d) => normalize_array(d),
        RawSamples::Float(d) => normalize_array(d),
    };
    Ok(Frame::new(data, raw.bit_depth))
}

/// Min/max rescale of any numeric grid to f32 in [0.0, 1.0].
pub fn normalize_array<T>(data: &Array2<T>) -> Array2<f32>
where
    T: AsPrimitive<f64>,
{
    let finite = |v: &T| -> f64 {
        let x: f64 = v.as_();
        if x.is_finite() {
            x
        } else {
            0.0
        }
    };

    let (min, max) = data
        .iter()
        .map(finite)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

    let range = max - min;
    if range <= 0.0 {
        return Array2::<f32>::zeros(data.dim());
    }

    data.map(|v| ((finite(v) - min) / range) as f32)
}
