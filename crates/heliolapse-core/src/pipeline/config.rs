use std::path::PathBuf;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_CRF, DEFAULT_FPS, DEFAULT_ITERATIONS, DEFAULT_STD_DEV};
use crate::error::{HelioError, Result};

/// Everything one alignment run needs. Built once, passed by reference.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AlignConfig {
    /// Frame every other frame is aligned onto.
    pub reference: PathBuf,
    /// Directory holding the frames to align.
    pub input_dir: PathBuf,
    /// Directory aligned frames are written to.
    pub aligned_dir: PathBuf,
    /// Worker threads; `None` uses the available parallelism.
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub registration: RegistrationConfig,
    #[serde(default)]
    pub rigid: RigidConfig,
    #[serde(default)]
    pub video: VideoConfig,
}

impl AlignConfig {
    pub fn new(
        reference: impl Into<PathBuf>,
        input_dir: impl Into<PathBuf>,
        aligned_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            reference: reference.into(),
            input_dir: input_dir.into(),
            aligned_dir: aligned_dir.into(),
            workers: None,
            registration: RegistrationConfig::default(),
            rigid: RigidConfig::default(),
            video: VideoConfig::default(),
        }
    }

    /// Number of worker threads the run will use.
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.workers == Some(0) {
            return Err(HelioError::InvalidConfig("workers must be positive".into()));
        }
        self.registration.validate()?;
        self.video.validate()
    }
}

/// Which image supplies the gradient of the demons force.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DemonsForce {
    /// Gradient of the fixed image (classic demons).
    #[default]
    Fixed,
    /// Average of the fixed and warped-moving gradients.
    Symmetric,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationMode {
    SingleResolution,
    /// Three-level pyramid, downsample factors 4, 2, 1.
    #[default]
    MultiResolution,
}

impl std::fmt::Display for RegistrationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SingleResolution => write!(f, "single-resolution"),
            Self::MultiResolution => write!(f, "multi-resolution"),
        }
    }
}

impl std::fmt::Display for DemonsForce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed => write!(f, "fixed"),
            Self::Symmetric => write!(f, "symmetric"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistrationConfig {
    /// Total demons iterations (split across levels in pyramid mode).
    pub iterations: usize,
    /// Standard deviation of the field smoothing Gaussian, in level pixels.
    pub std_dev: f32,
    #[serde(default)]
    pub mode: RegistrationMode,
    #[serde(default)]
    pub force: DemonsForce,
    /// Fail a frame whose largest displacement exceeds this fraction of the
    /// image diagonal. Unbounded when absent.
    #[serde(default)]
    pub max_displacement_fraction: Option<f32>,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            std_dev: DEFAULT_STD_DEV,
            mode: RegistrationMode::default(),
            force: DemonsForce::default(),
            max_displacement_fraction: None,
        }
    }
}

impl RegistrationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(HelioError::InvalidConfig(
                "iterations must be positive".into(),
            ));
        }
        if !(self.std_dev.is_finite() && self.std_dev > 0.0) {
            return Err(HelioError::InvalidConfig(format!(
                "std_dev must be positive, got {}",
                self.std_dev
            )));
        }
        if let Some(fraction) = self.max_displacement_fraction {
            if !(fraction.is_finite() && fraction > 0.0) {
                return Err(HelioError::InvalidConfig(format!(
                    "max_displacement_fraction must be positive, got {fraction}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RigidConfig {
    /// Estimate the residual translation by phase correlation after the
    /// centre-to-centre initializer.
    pub refine_translation: bool,
}

impl Default for RigidConfig {
    fn default() -> Self {
        Self {
            refine_translation: true,
        }
    }
}

/// Regex rewrite applied to a frame's file stem to build its caption.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaptionRewrite {
    pub pattern: String,
    pub replacement: String,
}

impl CaptionRewrite {
    pub fn compile(&self) -> Result<Regex> {
        Regex::new(&self.pattern).map_err(|e| {
            HelioError::InvalidConfig(format!("caption pattern {:?}: {e}", self.pattern))
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Output movie path; the next free `timelapse-N.mp4` when absent.
    #[serde(default)]
    pub movie: Option<PathBuf>,
    pub fps: u32,
    /// x264 constant rate factor (0-51, lower is better).
    pub crf: u32,
    /// Burn the frame caption into the movie.
    #[serde(default)]
    pub caption: bool,
    #[serde(default)]
    pub caption_rewrite: Option<CaptionRewrite>,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            movie: None,
            fps: DEFAULT_FPS,
            crf: DEFAULT_CRF,
            caption: false,
            caption_rewrite: None,
        }
    }
}

impl VideoConfig {
    pub fn validate(&self) -> Result<()> {
        if self.fps == 0 {
            return Err(HelioError::InvalidConfig("fps must be positive".into()));
        }
        if self.crf > 51 {
            return Err(HelioError::InvalidConfig(format!(
                "crf must be in 0..=51, got {}",
                self.crf
            )));
        }
        if let Some(rewrite) = &self.caption_rewrite {
            rewrite.compile()?;
        }
        Ok(())
    }
}
