use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tether_core::SyncJob;

#[derive(Parser)]
#[command(name = "tether")]
#[command(about = "Keep a device in sync with its primary or backup server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Primary (local) server base URL
    #[arg(long, global = true, value_name = "URL")]
    pub primary_url: Option<String>,

    /// Backup (remote) server base URL
    #[arg(long, global = true, value_name = "URL")]
    pub backup_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the sync coordinator until interrupted
    Run {
        /// Print each job report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check whether the primary server is reachable
    Probe {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run one sync job now
    Sync {
        /// Job to run
        #[arg(value_enum, default_value_t = SyncKind::Full)]
        kind: SyncKind,
        /// Skip the probe and send everything to the backup server
        #[arg(long)]
        offline: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect or write the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum SyncKind {
    Full,
    Incremental,
}

impl From<SyncKind> for SyncJob {
    fn from(kind: SyncKind) -> Self {
        match kind {
            SyncKind::Full => Self::Full,
            SyncKind::Incremental => Self::Incremental,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the resolved configuration (token redacted)
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the config file path
    Path,
    /// Write settings to the config file, keeping existing values
    Init {
        /// Bearer token sent with every request
        #[arg(long, value_name = "TOKEN")]
        auth_token: Option<String>,
        /// Probe period in seconds
        #[arg(long, value_name = "SECS")]
        probe_interval: Option<u64>,
        /// Incremental sync period in seconds
        #[arg(long, value_name = "SECS")]
        incremental_interval: Option<u64>,
        /// Full sync period in seconds
        #[arg(long, value_name = "SECS")]
        full_interval: Option<u64>,
        /// Worker pool size
        #[arg(long, value_name = "N")]
        workers: Option<usize>,
    },
}
