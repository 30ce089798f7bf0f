//! Lightcone CLI
//!
//! Driver for the light-cone relation kernel.
//!
//! # Commands
//!
//! - `run`: generate random points, run the kernel, check it against the
//!   sequential oracle and print the report
//! - `info`: print device and launch-grid geometry for a problem size
//!
//! # Exit codes
//!
//! - 0: success
//! - 1: runtime failure (config, allocation, timeout, kernel error)
//! - 2: kernel output disagrees with the oracle

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod error;

/// Light-cone relation kernel driver
#[derive(Parser)]
#[command(name = "lightcone")]
#[command(version)]
#[command(about = "Compute and validate pairwise light-cone relation matrices")]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate points, run the kernel and validate it against the oracle
    Run(commands::run::RunArgs),
    /// Show device and launch-grid information
    Info(commands::info::InfoArgs),
}

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = match cli.command {
        Commands::Run(args) => commands::run::run_command(args),
        Commands::Info(args) => commands::info::info_command(args),
    };

    std::process::exit(exit_code);
}
