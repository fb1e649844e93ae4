//! mythfs CLI Binary
//!
//! Command-line interface for browsing, reading, deleting and mounting
//! recordings.

use anyhow::Context;
use clap::Parser;
use mythfs::logging::init_logging;
use mythfs::tooling::cli::{apply_log_overrides, load_config, Cli, CliContext};
use std::process;

fn run(cli: &Cli) -> anyhow::Result<String> {
    let mut config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    apply_log_overrides(cli, &mut config);

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    let context = CliContext::from_config(config, cli.manifest_dir.clone())
        .context("Failed to open recordings")?;
    Ok(context.execute(&cli.command)?)
}

fn main() {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}
