use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use heliolapse_core::io::FileCodec;
use heliolapse_core::pipeline::config::{AlignConfig, DemonsForce, RegistrationMode};
use heliolapse_core::pipeline::{run_alignment_reported, AlignmentReport};

use crate::interrupt::cancel_on_interrupt;
use crate::progress::BarReporter;
use crate::summary::{print_align_summary, print_report};

#[derive(Args)]
pub struct AlignArgs {
    /// Reference frame (FITS or PNG); other frames are aligned onto it
    #[arg(long = "ref")]
    pub reference: Option<PathBuf>,

    /// Directory of frames to align
    #[arg(long, default_value = "./input")]
    pub input_dir: PathBuf,

    /// Directory for aligned frames
    #[arg(long, default_value = "./aligned")]
    pub aligned_dir: PathBuf,

    /// Alignment config file (TOML); replaces the other options
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Demons iteration budget
    #[arg(long, default_value = "1200")]
    pub iterations: usize,

    /// Standard deviation of the displacement field smoothing
    #[arg(long, default_value = "4.0")]
    pub stddev: f32,

    /// Worker threads (default: CPU count)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Register at full resolution only, without the pyramid
    #[arg(long)]
    pub single_resolution: bool,

    /// Use symmetric demons forces
    #[arg(long)]
    pub fast: bool,

    /// Skip the phase-correlation translation refinement
    #[arg(long)]
    pub no_refine: bool,

    /// Fail frames whose displacement exceeds this fraction of the diagonal
    #[arg(long)]
    pub max_displacement: Option<f32>,
}

pub fn run(args: &AlignArgs) -> Result<ExitCode> {
    let config = build_config(args)?;
    let report = align(&config)?;
    Ok(ExitCode::from(report.outcome().exit_code() as u8))
}

/// Load the TOML config, or assemble one from the flags.
pub fn build_config(args: &AlignArgs) -> Result<AlignConfig> {
    if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        let config: AlignConfig = toml::from_str(&contents).context("Invalid alignment config")?;
        return Ok(config);
    }

    let Some(reference) = args.reference.clone() else {
        bail!("--ref is required unless --config is given");
    };

    let mut config = AlignConfig::new(reference, &args.input_dir, &args.aligned_dir);
    config.workers = args.workers;
    config.registration.iterations = args.iterations;
    config.registration.std_dev = args.stddev;
    config.registration.max_displacement_fraction = args.max_displacement;
    if args.single_resolution {
        config.registration.mode = RegistrationMode::SingleResolution;
    }
    if args.fast {
        config.registration.force = DemonsForce::Symmetric;
    }
    config.rigid.refine_translation = !args.no_refine;
    Ok(config)
}

/// Run the alignment with a progress bar, Ctrl-C handling and a summary.
pub fn align(config: &AlignConfig) -> Result<AlignmentReport> {
    config.validate()?;
    print_align_summary(config);

    let cancel = cancel_on_interrupt()?;
    let reporter = Arc::new(BarReporter::new()?);
    let result = run_alignment_reported(config, Arc::new(FileCodec), reporter.clone(), &cancel);
    reporter.finish();

    let report = result?;
    print_report(&report);
    Ok(report)
}
