use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HelioError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Shape mismatch: expected {expected_w}x{expected_h}, got {actual_w}x{actual_h}")]
    ShapeMismatch {
        expected_w: usize,
        expected_h: usize,
        actual_w: usize,
        actual_h: usize,
    },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid FITS file {path}: {reason}")]
    InvalidFits { path: PathBuf, reason: String },

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Displacement field diverged: max magnitude {max:.2} px exceeds bound {bound:.2} px")]
    Divergence { max: f64, bound: f64 },

    #[error("Reference frame {path}: {source}")]
    Reference {
        path: PathBuf,
        #[source]
        source: Box<HelioError>,
    },

    #[error("No input frames found in {0}")]
    EmptySequence(PathBuf),

    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("Video assembly failed: {0}")]
    Video(String),

    #[error("Worker pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Run cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, HelioError>;
