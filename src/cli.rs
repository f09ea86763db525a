use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// ERT ensemble analysis and job queue front end.
#[derive(Parser)]
#[command(
    name = "ert",
    version,
    about = "Ensemble Kalman filter updates and simulation job scheduling"
)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Run one analysis update on the matrices of a JSON case file.
    Update(UpdateArgs),
    /// Run the forward-model jobs of a project file to completion.
    Run(RunArgs),
}

/// Arguments for the `update` subcommand.
#[derive(clap::Args)]
pub struct UpdateArgs {
    /// Path to TOML project file.
    #[arg(short, long, default_value = "ert.toml")]
    pub config: PathBuf,

    /// Path to the JSON case file holding A, S, R, dObs, E and D.
    #[arg(long)]
    pub case: PathBuf,

    /// Path for the updated ensemble JSON.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Override global RNG seed from config.
    #[arg(short, long)]
    pub seed: Option<u64>,
}

/// Arguments for the `run` subcommand.
#[derive(clap::Args)]
pub struct RunArgs {
    /// Path to TOML project file.
    #[arg(short, long, default_value = "ert.toml")]
    pub config: PathBuf,
}
