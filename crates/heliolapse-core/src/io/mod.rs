//! Frame containers: format dispatch, the codec seam and directory listing.

pub mod fits;
pub mod image_io;
pub mod listing;

use std::path::Path;

use crate::error::Result;
use crate::frame::{QuantizedFrame, RawFrame};

/// Supported single-channel frame containers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameFormat {
    Fits,
    Png,
}

impl FrameFormat {
    /// Resolve a container from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "fits" | "fit" | "fts" => Some(Self::Fits),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl std::fmt::Display for FrameFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fits => write!(f, "FITS"),
            Self::Png => write!(f, "PNG"),
        }
    }
}

/// Decode/encode capability used by the pipeline.
///
/// Implementations must be shareable across worker threads.
pub trait FrameCodec: Send + Sync {
    fn decode(&self, path: &Path, format: FrameFormat) -> Result<RawFrame>;

    fn encode(&self, path: &Path, format: FrameFormat, frame: &QuantizedFrame) -> Result<()>;
}

/// Codec backed by the `image` crate (PNG) and `fitrs` (FITS).
#[derive(Clone, Copy, Debug, Default)]
pub struct FileCodec;

impl FrameCodec for FileCodec {
    fn decode(&self, path: &Path, format: FrameFormat) -> Result<RawFrame> {
        match format {
            FrameFormat::Fits => fits::load_fits(path),
            FrameFormat::Png => image_io::load_png(path),
        }
    }

    fn encode(&self, path: &Path, format: FrameFormat, frame: &QuantizedFrame) -> Result<()> {
        match format {
            FrameFormat::Fits => fits::save_fits(frame, path),
            FrameFormat::Png => image_io::save_png16(frame, path),
        }
    }
}
