mod cli;
mod config;
mod convert;
mod logging;
mod run_cmd;
mod update_cmd;

use std::fs;
use std::path::Path;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;

use crate::cli::{Cli, Command};
use crate::config::ErtConfig;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Update(args) => update_cmd::run(args),
        Command::Run(args) => run_cmd::run(args),
    }
}

/// Reads and parses a TOML project file.
pub(crate) fn load_config(path: &Path) -> Result<ErtConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("failed to parse config: {}", path.display()))
}
