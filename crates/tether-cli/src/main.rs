//! Tether CLI - run and inspect the background sync coordinator
//!
//! `tether run` keeps a device synced with its primary server and falls back
//! to the backup server whenever the primary is unreachable.

mod cli;
mod commands;
mod error;


use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::common::{ConfigOverrides, ConfigSource};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::probe::run_probe;
use crate::commands::run::run_coordinator;
use crate::commands::sync::run_sync;
use crate::error::CliError;

const DEFAULT_LOG_FILTER: &str = "tether=info,tether_core=info";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let source = ConfigSource::new(
        cli.config,
        ConfigOverrides {
            primary_url: cli.primary_url,
            backup_url: cli.backup_url,
        },
    );

    match cli.command {
        Commands::Run { json } => run_coordinator(&source, json).await?,
        Commands::Probe { json } => run_probe(&source, json).await?,
        Commands::Sync {
            kind,
            offline,
            json,
        } => run_sync(&source, kind.into(), offline, json).await?,
        Commands::Config { command } => run_config(command, &source)?,
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref())?,
    }

    Ok(())
}
