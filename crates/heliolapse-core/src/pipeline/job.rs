use std::path::{Path, PathBuf};

use ndarray::Array2;
use tracing::debug;

use crate::align::resample::resample_and_quantize;
use crate::align::rigid::{pre_align, RigidTransform};
use crate::align::transform::{DisplacementStats, Transform};
use crate::consts::U16_MAX_F32;
use crate::error::{HelioError, Result};
use crate::filters::histogram::{levels_u16, HistogramMapping};
use crate::filters::normalize::normalize;
use crate::frame::{ensure_usable_shape, Frame};
use crate::io::{FrameCodec, FrameFormat};
use crate::register::register;

use super::config::AlignConfig;
use super::types::CancelFlag;

/// The frame every job aligns onto. Loaded once, shared read-only.
#[derive(Clone, Debug)]
pub struct ReferenceFrame {
    pub path: PathBuf,
    pub format: FrameFormat,
    /// Normalized reference grid; defines the output shape.
    pub frame: Frame,
    /// Reference as 16-bit levels, the target of histogram matching.
    pub levels: Array2<u16>,
    /// `levels` back in [0, 1], the fixed image of deformable registration.
    pub fixed: Array2<f32>,
}

impl ReferenceFrame {
    pub fn new(path: PathBuf, format: FrameFormat, frame: Frame) -> Result<Self> {
        let (h, w) = frame.data.dim();
        ensure_usable_shape(h, w)?;
        let levels = levels_u16(&frame.data);
        let fixed = levels.mapv(|v| v as f32 / U16_MAX_F32);
        Ok(Self {
            path,
            format,
            frame,
            levels,
            fixed,
        })
    }

    /// Output grid shape `(height, width)`.
    pub fn shape(&self) -> (usize, usize) {
        self.frame.data.dim()
    }

    /// Extension given to aligned outputs.
    pub fn extension(&self) -> String {
        crate::io::listing::extension_or(
            &self.path,
            match self.format {
                FrameFormat::Fits => "fits",
                FrameFormat::Png => "png",
            },
        )
    }
}

/// One input frame waiting to be aligned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameJob {
    /// Position in the sorted input listing.
    pub index: usize,
    pub path: PathBuf,
    /// Container resolved from the extension; `None` when unsupported.
    pub format: Option<FrameFormat>,
}

impl FrameJob {
    pub fn new(index: usize, path: PathBuf) -> Self {
        let format = FrameFormat::from_path(&path);
        Self {
            index,
            path,
            format,
        }
    }
}

/// A frame that made it through every stage.
#[derive(Clone, Debug)]
pub struct AlignedFrame {
    pub index: usize,
    pub input: PathBuf,
    pub output: PathBuf,
    pub width: usize,
    pub height: usize,
    pub rigid: RigidTransform,
    pub stats: DisplacementStats,
}

/// A frame that failed; `reason` is the error message.
#[derive(Clone, Debug)]
pub struct FailedFrame {
    pub index: usize,
    pub input: PathBuf,
    pub reason: String,
}

/// Terminal state of one job.
#[derive(Clone, Debug)]
pub enum AlignmentResult {
    Succeeded(AlignedFrame),
    Failed(FailedFrame),
}

impl AlignmentResult {
    pub fn index(&self) -> usize {
        match self {
            Self::Succeeded(s) => s.index,
            Self::Failed(f) => f.index,
        }
    }

    pub fn input(&self) -> &Path {
        match self {
            Self::Succeeded(s) => &s.input,
            Self::Failed(f) => &f.input,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }
}

/// Run the full per-frame pipeline for `job` and write its output.
///
/// Stages: decode, normalize, rigid pre-align, histogram match, deformable
/// registration, resample and quantize, encode.
pub fn align_frame(
    job: &FrameJob,
    reference: &ReferenceFrame,
    config: &AlignConfig,
    codec: &dyn FrameCodec,
    cancel: &CancelFlag,
) -> Result<AlignedFrame> {
    let format = job.format.ok_or_else(|| {
        HelioError::UnsupportedFormat(job.path.display().to_string())
    })?;

    let raw = codec.decode(&job.path, format)?;
    let moving = normalize(&raw)?;
    let shape = reference.shape();

    let (rigid, pre_aligned) = pre_align(&reference.frame, &moving, &config.rigid)?;

    let mapping = HistogramMapping::build(&levels_u16(&pre_aligned.data), &reference.levels);
    let matched = levels_u16(&pre_aligned.data).mapv(|v| mapping.map(v) / U16_MAX_F32);

    let registration = register(&reference.fixed, &matched, &config.registration, cancel)?;
    debug!(
        file = %job.path.display(),
        stats = %registration.stats,
        "Displacement field"
    );

    let transform = Transform::rigid_only(rigid).with_field(registration.field);
    let output = resample_and_quantize(&moving, &transform, Some(&mapping), shape)?;

    let output_path = crate::io::listing::aligned_output_path(
        &config.aligned_dir,
        &job.path,
        &reference.extension(),
    );
    codec.encode(&output_path, reference.format, &output)?;

    Ok(AlignedFrame {
        index: job.index,
        input: job.path.clone(),
        output: output_path,
        width: output.width(),
        height: output.height(),
        rigid,
        stats: registration.stats,
    })
}
