//! Error types for tether-core

use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias using tether-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tether-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The coordinator (or one of its tasks) has already shut down
    #[error("Coordinator stopped: {0}")]
    CoordinatorStopped(&'static str),
}
