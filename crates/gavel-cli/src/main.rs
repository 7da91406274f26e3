//! Gavel CLI
//!
//! Command-line interface for a file-backed governance ledger.

use clap::Parser;
use tracing::debug;

mod commands;
mod config;
mod ledger;
mod output;
mod telemetry;

use commands::{execute, Cli, Commands};
use config::CliConfig;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    // `config` writes the file, so it must not require one to exist.
    let config = match cli.command {
        Commands::Config { .. } => CliConfig::default(),
        _ => CliConfig::load(cli.config.as_deref())?,
    };

    let log_level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    telemetry::init_telemetry(&log_level, config.json_logs)?;

    debug!("Using ledger {}", cli.ledger.as_ref().unwrap_or(&config.ledger_path).display());

    execute(cli, config)
}
