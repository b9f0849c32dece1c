//! Anchorage CLI Binary
//!
//! Command-line interface for the anchorage anchor lifecycle system.

use anyhow::Context;
use clap::Parser;
use std::process;
use tracing::{error, info};

use anchorage::cli::{map_error, Cli, RunContext};
use anchorage::logging::init_logging;

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!("{:#}", err);
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let context = RunContext::new(cli.config.clone())
        .map_err(|e| anyhow::anyhow!(map_error(&e)))
        .context("failed to initialize")?;

    init_logging(Some(&context.config().logging))
        .map_err(|e| anyhow::anyhow!(map_error(&e)))
        .context("failed to initialize logging")?;

    info!("anchorage CLI starting");

    match context.execute(&cli.command) {
        Ok(output) => {
            info!("command completed");
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            error!("command failed: {}", e);
            Err(anyhow::anyhow!(map_error(&e)))
        }
    }
}
