//! ---
//! lvnet_section: "05-external-interfaces"
//! lvnet_subsection: "binary"
//! lvnet_type: "source"
//! lvnet_scope: "code"
//! lvnet_description: "Control CLI for running network studies from scenario files."
//! lvnet_version: "v0.0.0-prealpha"
//! lvnet_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lvnet_common::{init_tracing, AppConfig};

mod commands;

const CONFIG_CANDIDATES: [&str; 2] = ["lvnet.toml", "configs/lvnet.toml"];

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Radial low-voltage network calculation utility",
    long_about = None
)]
struct Cli {
    /// Configuration file (defaults to LVNET_CONFIG, then ./lvnet.toml).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the full calculation and export reports.
    Calculate(commands::CalculateCommand),
    /// Upgrade undersized conductors.
    Optimize(commands::OptimizeCommand),
    /// Estimate voltage-drop risk by resampling loads.
    #[command(name = "monte-carlo")]
    MonteCarlo(commands::MonteCarloCommand),
    /// Check a scenario for reference and topology problems.
    Validate(commands::ValidateCommand),
}

fn load_config(explicit: Option<&PathBuf>) -> Result<AppConfig> {
    match explicit {
        Some(path) => AppConfig::from_path(path.clone())
            .with_context(|| format!("loading configuration {}", path.display())),
        None => AppConfig::load_or_default(&CONFIG_CANDIDATES),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    init_tracing("lvnetctl", &config.logging)?;

    match cli.command {
        Commands::Calculate(cmd) => cmd.execute(&config),
        Commands::Optimize(cmd) => cmd.execute(&config),
        Commands::MonteCarlo(cmd) => cmd.execute(&config),
        Commands::Validate(cmd) => cmd.execute(&config),
    }
}
