use std::io;

use tether_core::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] tether_core::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Could not find a config directory; pass --config PATH")]
    NoConfigDir,
    #[error("Primary server at {0} is unreachable")]
    Unreachable(String),
    #[error("{failed} of {total} sync calls failed")]
    JobFailed { failed: usize, total: usize },
}
