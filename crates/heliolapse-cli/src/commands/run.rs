use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use heliolapse_core::pipeline::RunOutcome;
use tracing::warn;

use super::align::{align, build_config, AlignArgs};
use super::movie::{assemble, VideoArgs};
use crate::summary::print_movie_saved;

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub align: AlignArgs,

    #[command(flatten)]
    pub video: VideoArgs,

    /// Align only; do not assemble the movie
    #[arg(long)]
    pub no_movie: bool,
}

pub fn run(args: &RunArgs) -> Result<ExitCode> {
    let mut config = build_config(&args.align)?;
    if args.align.config.is_none() {
        config.video = args.video.to_config();
    }

    let report = align(&config)?;
    let outcome = report.outcome();

    if args.no_movie {
        return Ok(ExitCode::from(outcome.exit_code() as u8));
    }
    if outcome == RunOutcome::Failed {
        warn!("No frame aligned; skipping movie");
        return Ok(ExitCode::from(outcome.exit_code() as u8));
    }

    let movie = assemble(&report.manifest, &config.video)?;
    print_movie_saved(&movie, report.manifest.len());
    Ok(ExitCode::from(outcome.exit_code() as u8))
}
