use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use heliolapse_core::frame::RawSamples;
use heliolapse_core::io::{FileCodec, FrameCodec, FrameFormat};

#[derive(Args)]
pub struct InfoArgs {
    /// Frame files (FITS or PNG)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

pub fn run(args: &InfoArgs) -> Result<ExitCode> {
    for file in &args.files {
        let format = FrameFormat::from_path(file)
            .with_context(|| format!("Unsupported format: {}", file.display()))?;
        let raw = FileCodec
            .decode(file, format)
            .with_context(|| format!("Failed to read {}", file.display()))?;

        let (min, max) = match &raw.samples {
            RawSamples::Integer(d) => d.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v as f64), hi.max(v as f64))
            }),
            RawSamples::Float(d) => d
                .iter()
                .filter(|v| v.is_finite())
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                    (lo.min(v), hi.max(v))
                }),
        };

        println!("File:        {}", file.display());
        println!("Format:      {}", format);
        println!("Dimensions:  {}x{}", raw.width(), raw.height());
        println!("Bit depth:   {}", raw.bit_depth);
        println!("Samples:     {}", raw.kind());
        if min <= max {
            println!("Range:       {} .. {}", min, max);
        } else {
            println!("Range:       no finite samples");
        }
        println!();
    }
    Ok(ExitCode::SUCCESS)
}
