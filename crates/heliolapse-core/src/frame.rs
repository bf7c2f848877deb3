use ndarray::Array2;

use crate::error::{HelioError, Result};

/// Sample type carried by a grid at a given pipeline stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleKind {
    RawInteger,
    RawFloat,
    Normalized,
    Quantized16,
}

impl std::fmt::Display for SampleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RawInteger => write!(f, "raw integer"),
            Self::RawFloat => write!(f, "raw float"),
            Self::Normalized => write!(f, "normalized float"),
            Self::Quantized16 => write!(f, "quantized 16-bit"),
        }
    }
}

/// Samples exactly as the decoder produced them.
#[derive(Clone, Debug)]
pub enum RawSamples {
    Integer(Array2<i64>),
    Float(Array2<f64>),
}

/// A decoded, not yet normalized frame.
#[derive(Clone, Debug)]
pub struct RawFrame {
    pub samples: RawSamples,
    /// Bit depth of the stored samples (8, 16, 32 or 64).
    pub bit_depth: u8,
}

impl RawFrame {
    pub fn integer(data: Array2<i64>, bit_depth: u8) -> Self {
        Self {
            samples: RawSamples::Integer(data),
            bit_depth,
        }
    }

    pub fn float(data: Array2<f64>, bit_depth: u8) -> Self {
        Self {
            samples: RawSamples::Float(data),
            bit_depth,
        }
    }

    pub fn kind(&self) -> SampleKind {
        match self.samples {
            RawSamples::Integer(_) => SampleKind::RawInteger,
            RawSamples::Float(_) => SampleKind::RawFloat,
        }
    }

    /// Grid shape as `(height, width)`.
    pub fn dim(&self) -> (usize, usize) {
        match &self.samples {
            RawSamples::Integer(d) => d.dim(),
            RawSamples::Float(d) => d.dim(),
        }
    }

    pub fn width(&self) -> usize {
        self.dim().1
    }

    /// Read the samples as 16-bit levels without rescaling.
    ///
    /// Values are rounded and clamped to `0..=65535`; NaN reads as 0.
    pub fn to_quantized(&self) -> QuantizedFrame {
        let data = match &self.samples {
            RawSamples::Integer(d) => d.mapv(|v| v.clamp(0, u16::MAX as i64) as u16),
            RawSamples::Float(d) => d.mapv(|v| {
                if v.is_nan() {
                    0
                } else {
                    v.round().clamp(0.0, u16::MAX as f64) as u16
                }
            }),
        };
        QuantizedFrame::new(data)
    }

    pub fn height(&self) -> usize {
        self.dim().0
    }
}

/// A single grayscale image frame.
/// Pixel values are f32 in [0.0, 1.0].
#[derive(Clone, Debug)]
pub struct Frame {
    /// Pixel data, row-major, shape = (height, width)
    pub data: Array2<f32>,
    /// Bit depth of the raw frame this was normalized from
    pub original_bit_depth: u8,
}

impl Frame {
    pub fn new(data: Array2<f32>, bit_depth: u8) -> Self {
        Self {
            data,
            original_bit_depth: bit_depth,
        }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn kind(&self) -> SampleKind {
        SampleKind::Normalized
    }
}

/// Final 16-bit output of the pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct QuantizedFrame {
    pub data: Array2<u16>,
}

impl QuantizedFrame {
    pub fn new(data: Array2<u16>) -> Self {
        Self { data }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn kind(&self) -> SampleKind {
        SampleKind::Quantized16
    }
}

/// Reject grids that cannot take part in registration.
///
/// Interpolation and gradients need at least a 2x2 neighbourhood.
pub fn ensure_usable_shape(height: usize, width: usize) -> Result<()> {
    if height < 2 || width < 2 {
        return Err(HelioError::InvalidDimensions { width, height });
    }
    Ok(())
}

/// Fail with `ShapeMismatch` unless `actual` equals `expected` (both `(h, w)`).
pub fn ensure_same_shape(expected: (usize, usize), actual: (usize, usize)) -> Result<()> {
    if expected != actual {
        return Err(HelioError::ShapeMismatch {
            expected_w: expected.1,
            expected_h: expected.0,
            actual_w: actual.1,
            actual_h: actual.0,
        });
    }
    Ok(())
}
