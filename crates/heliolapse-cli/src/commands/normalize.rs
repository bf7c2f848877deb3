use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Args;
use heliolapse_core::io::listing::list_frames;
use heliolapse_core::io::{FileCodec, FrameFormat};
use heliolapse_core::pipeline::match_sequence;

#[derive(Args)]
pub struct NormalizeArgs {
    /// Reference frame whose histogram the others are matched to
    #[arg(long = "ref")]
    pub reference: PathBuf,

    /// Directory of frames to normalize
    pub input_dir: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "./normalized")]
    pub output: PathBuf,
}

pub fn run(args: &NormalizeArgs) -> Result<ExitCode> {
    let format = FrameFormat::from_path(&args.reference).with_context(|| {
        format!("Unsupported reference format: {}", args.reference.display())
    })?;
    let frames = list_frames(&args.input_dir, format)?;
    if frames.is_empty() {
        bail!("No {format} frames found in {}", args.input_dir.display());
    }

    println!("Matching {} frames to {}", frames.len(), args.reference.display());
    let results = match_sequence(&args.reference, &frames, &args.output, &FileCodec)?;

    let mut failed = 0;
    for r in &results {
        if let Err(reason) = &r.output {
            failed += 1;
            println!("  failed: {}: {reason}", r.input.display());
        }
    }
    println!(
        "{} of {} frames written to {}",
        results.len() - failed,
        results.len(),
        args.output.display()
    );

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}
