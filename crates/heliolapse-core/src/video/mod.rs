//! Timelapse assembly seam: manifest, captions and the encoder trait.

pub mod caption;
pub mod manifest;

use std::path::{Path, PathBuf};

use crate::consts::MOVIE_BASE_NAME;
use crate::error::Result;
use crate::pipeline::config::VideoConfig;

pub use caption::{srt_document, Captioner};
pub use manifest::{FrameManifest, ManifestEntry};

/// Turns an ordered manifest into a movie file.
pub trait VideoAssembler {
    fn assemble(&self, manifest: &FrameManifest, output: &Path, config: &VideoConfig)
        -> Result<()>;
}

/// First `timelapse-N.mp4` (N >= 1) in `dir` that does not exist yet.
pub fn next_movie_path(dir: &Path) -> PathBuf {
    (1..)
        .map(|n| dir.join(format!("{MOVIE_BASE_NAME}-{n}.mp4")))
        .find(|p| !p.exists())
        .unwrap_or_else(|| dir.join(format!("{MOVIE_BASE_NAME}.mp4")))
}

/// Movie path for a run: the configured one, else the next free name in `dir`.
pub fn movie_path(config: &VideoConfig, dir: &Path) -> PathBuf {
    config.movie.clone().unwrap_or_else(|| next_movie_path(dir))
}
