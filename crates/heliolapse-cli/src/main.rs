mod commands;
mod ffmpeg;
mod interrupt;
mod progress;
mod summary;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use heliolapse_core::error::HelioError;
use heliolapse_core::pipeline::EXIT_INTERRUPTED;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "heliolapse", about = "Solar timelapse frame alignment tool")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Align a directory of frames and assemble the timelapse
    Run(commands::run::RunArgs),
    /// Align a directory of frames onto a reference
    Align(commands::align::AlignArgs),
    /// Assemble a movie from already aligned frames
    Movie(commands::movie::MovieArgs),
    /// Histogram-match a directory of frames to a reference
    Normalize(commands::normalize::NormalizeArgs),
    /// Show frame dimensions and sample ranges
    Info(commands::info::InfoArgs),
    /// Print or save the default configuration
    Config(commands::config::ConfigArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Align(args) => commands::align::run(args),
        Commands::Movie(args) => commands::movie::run(args),
        Commands::Normalize(args) => commands::normalize::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::Config(args) => commands::config::run(args),
    };

    match result {
        Ok(code) => code,
        Err(e) if matches!(e.downcast_ref::<HelioError>(), Some(HelioError::Cancelled)) => {
            eprintln!("Interrupted.");
            ExitCode::from(EXIT_INTERRUPTED as u8)
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
