use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::Args;
use heliolapse_core::consts::{DEFAULT_CRF, DEFAULT_FPS};
use heliolapse_core::io::listing::list_all_frames;
use heliolapse_core::pipeline::config::{CaptionRewrite, VideoConfig};
use heliolapse_core::video::{movie_path, Captioner, FrameManifest, VideoAssembler};

use crate::ffmpeg::FfmpegAssembler;
use crate::summary::print_movie_saved;

/// Movie options shared by `run` and `movie`.
#[derive(Args)]
pub struct VideoArgs {
    /// Movie file (default: next free timelapse-N.mp4 in the current directory)
    #[arg(long)]
    pub movie: Option<PathBuf>,

    /// Frames per second
    #[arg(long, default_value_t = DEFAULT_FPS)]
    pub fps: u32,

    /// x264 constant rate factor (0-51, lower is better)
    #[arg(long, default_value_t = DEFAULT_CRF)]
    pub crf: u32,

    /// Burn each frame's file name into the movie
    #[arg(long)]
    pub caption: bool,

    /// Regex applied to the file name before it is used as caption
    #[arg(long, requires = "caption_replace")]
    pub caption_pattern: Option<String>,

    /// Replacement for --caption-pattern ($1, ${name} refer to groups)
    #[arg(long, requires = "caption_pattern")]
    pub caption_replace: Option<String>,
}

impl VideoArgs {
    pub fn to_config(&self) -> VideoConfig {
        let caption_rewrite = match (&self.caption_pattern, &self.caption_replace) {
            (Some(pattern), Some(replacement)) => Some(CaptionRewrite {
                pattern: pattern.clone(),
                replacement: replacement.clone(),
            }),
            _ => None,
        };
        VideoConfig {
            movie: self.movie.clone(),
            fps: self.fps,
            crf: self.crf,
            caption: self.caption || caption_rewrite.is_some(),
            caption_rewrite,
        }
    }
}

#[derive(Args)]
pub struct MovieArgs {
    /// Directory of aligned frames (FITS or PNG)
    pub input_dir: PathBuf,

    #[command(flatten)]
    pub video: VideoArgs,
}

pub fn run(args: &MovieArgs) -> Result<ExitCode> {
    let config = args.video.to_config();
    config.validate()?;

    let frames = list_all_frames(&args.input_dir)?;
    if frames.is_empty() {
        bail!("No frames found in {}", args.input_dir.display());
    }
    let manifest = FrameManifest::from_paths(&frames, &Captioner::from_config(&config)?);
    let output = assemble(&manifest, &config)?;
    print_movie_saved(&output, manifest.len());
    Ok(ExitCode::SUCCESS)
}

/// Encode `manifest` with ffmpeg; returns the movie path.
pub fn assemble(manifest: &FrameManifest, config: &VideoConfig) -> Result<PathBuf> {
    let output = movie_path(config, Path::new("."));
    FfmpegAssembler::default().assemble(manifest, &output, config)?;
    Ok(output)
}
