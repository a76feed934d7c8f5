//! Coordinator configuration.
//!
//! Settings are layered: built-in defaults, then an optional JSON file, then
//! `TETHER_*` environment variables, then explicit overrides from the host
//! (for example CLI flags). Every layer is a [`ConfigFile`] with optional
//! fields; [`CoordinatorConfig::resolve`] validates the merged result.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Endpoint;
use crate::util::normalize_text_option;

pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_INCREMENTAL_INTERVAL: Duration = Duration::from_secs(300);
pub const DEFAULT_FULL_INTERVAL: Duration = Duration::from_secs(3_600);
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_WORKER_POOL_SIZE: usize = 4;
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

const MAX_WORKER_POOL_SIZE: usize = 64;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Failed to read config at {path}: {message}")]
    Read { path: String, message: String },
    #[error("Failed to write config at {path}: {message}")]
    Write { path: String, message: String },
}

/// Partial configuration as stored on disk or read from the environment.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_interval_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incremental_interval_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_interval_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_pool_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_capacity: Option<usize>,
}

impl fmt::Debug for ConfigFile {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ConfigFile")
            .field("primary_url", &self.primary_url)
            .field("backup_url", &self.backup_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("probe_interval_secs", &self.probe_interval_secs)
            .field("incremental_interval_secs", &self.incremental_interval_secs)
            .field("full_interval_secs", &self.full_interval_secs)
            .field("probe_timeout_secs", &self.probe_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("worker_pool_size", &self.worker_pool_size)
            .field("queue_capacity", &self.queue_capacity)
            .finish()
    }
}

impl ConfigFile {
    /// Load a config file. A missing file is an empty layer.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|error| ConfigError::Read {
            path: path.display().to_string(),
            message: error.to_string(),
        })?;
        let mut config =
            serde_json::from_str::<Self>(&raw).map_err(|error| ConfigError::Read {
                path: path.display().to_string(),
                message: error.to_string(),
            })?;
        config.normalize();
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        let write_error = |error: &dyn fmt::Display| ConfigError::Write {
            path: path.display().to_string(),
            message: error.to_string(),
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| write_error(&error))?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized =
            serde_json::to_string_pretty(&normalized).map_err(|error| write_error(&error))?;
        std::fs::write(path, serialized).map_err(|error| write_error(&error))
    }

    /// Read the `TETHER_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = std::env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self {
            primary_url: lookup("TETHER_PRIMARY_URL"),
            backup_url: lookup("TETHER_BACKUP_URL"),
            auth_token: lookup("TETHER_AUTH_TOKEN"),
            probe_interval_secs: parse_number(&lookup, "TETHER_PROBE_INTERVAL_SECS")?,
            incremental_interval_secs: parse_number(&lookup, "TETHER_INCREMENTAL_INTERVAL_SECS")?,
            full_interval_secs: parse_number(&lookup, "TETHER_FULL_INTERVAL_SECS")?,
            probe_timeout_secs: parse_number(&lookup, "TETHER_PROBE_TIMEOUT_SECS")?,
            request_timeout_secs: parse_number(&lookup, "TETHER_REQUEST_TIMEOUT_SECS")?,
            connect_timeout_secs: parse_number(&lookup, "TETHER_CONNECT_TIMEOUT_SECS")?,
            worker_pool_size: parse_number(&lookup, "TETHER_WORKERS")?,
            queue_capacity: None,
        };
        config.normalize();
        Ok(config)
    }

    /// Merge `other` on top of `self`; values set in `other` win.
    #[must_use]
    pub fn overlay(self, other: Self) -> Self {
        Self {
            primary_url: other.primary_url.or(self.primary_url),
            backup_url: other.backup_url.or(self.backup_url),
            auth_token: other.auth_token.or(self.auth_token),
            probe_interval_secs: other.probe_interval_secs.or(self.probe_interval_secs),
            incremental_interval_secs: other
                .incremental_interval_secs
                .or(self.incremental_interval_secs),
            full_interval_secs: other.full_interval_secs.or(self.full_interval_secs),
            probe_timeout_secs: other.probe_timeout_secs.or(self.probe_timeout_secs),
            request_timeout_secs: other.request_timeout_secs.or(self.request_timeout_secs),
            connect_timeout_secs: other.connect_timeout_secs.or(self.connect_timeout_secs),
            worker_pool_size: other.worker_pool_size.or(self.worker_pool_size),
            queue_capacity: other.queue_capacity.or(self.queue_capacity),
        }
    }

    /// Copy with the auth token masked, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.auth_token = copy.auth_token.map(|_| "[REDACTED]".to_string());
        copy
    }

    fn normalize(&mut self) {
        self.primary_url = normalize_text_option(self.primary_url.take());
        self.backup_url = normalize_text_option(self.backup_url.take());
        self.auth_token = normalize_text_option(self.auth_token.take());
    }
}

/// Validated runtime configuration for a [`crate::SyncCoordinator`].
#[derive(Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub endpoint: Endpoint,
    pub auth_token: Option<String>,
    pub probe_interval: Duration,
    pub incremental_interval: Duration,
    pub full_interval: Duration,
    pub probe_timeout: Duration,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub worker_pool_size: usize,
    pub queue_capacity: usize,
}

impl fmt::Debug for CoordinatorConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CoordinatorConfig")
            .field("endpoint", &self.endpoint)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("probe_interval", &self.probe_interval)
            .field("incremental_interval", &self.incremental_interval)
            .field("full_interval", &self.full_interval)
            .field("probe_timeout", &self.probe_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("worker_pool_size", &self.worker_pool_size)
            .field("queue_capacity", &self.queue_capacity)
            .finish()
    }
}

impl CoordinatorConfig {
    /// Configuration with default periods and timeouts.
    pub const fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            auth_token: None,
            probe_interval: DEFAULT_PROBE_INTERVAL,
            incremental_interval: DEFAULT_INCREMENTAL_INTERVAL,
            full_interval: DEFAULT_FULL_INTERVAL,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            worker_pool_size: DEFAULT_WORKER_POOL_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    #[must_use]
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = normalize_text_option(Some(token.into()));
        self
    }

    /// Set the probe, incremental and full periods
    #[must_use]
    pub const fn with_intervals(
        mut self,
        probe: Duration,
        incremental: Duration,
        full: Duration,
    ) -> Self {
        self.probe_interval = probe;
        self.incremental_interval = incremental;
        self.full_interval = full;
        self
    }

    #[must_use]
    pub const fn with_timeouts(mut self, probe: Duration, request: Duration) -> Self {
        self.probe_timeout = probe;
        self.request_timeout = request;
        self
    }

    #[must_use]
    pub const fn with_worker_pool_size(mut self, size: usize) -> Self {
        self.worker_pool_size = size;
        self
    }

    /// Validate a merged layer and fill in defaults.
    pub fn resolve(layer: ConfigFile) -> Result<Self, ConfigError> {
        let primary = layer
            .primary_url
            .ok_or(ConfigError::Missing("primary_url (TETHER_PRIMARY_URL)"))?;
        let backup = layer
            .backup_url
            .ok_or(ConfigError::Missing("backup_url (TETHER_BACKUP_URL)"))?;
        let endpoint = Endpoint::new(&primary, &backup)
            .map_err(|error| ConfigError::Invalid(error.to_string()))?;

        let config = Self {
            endpoint,
            auth_token: layer.auth_token,
            probe_interval: secs_or(layer.probe_interval_secs, DEFAULT_PROBE_INTERVAL),
            incremental_interval: secs_or(
                layer.incremental_interval_secs,
                DEFAULT_INCREMENTAL_INTERVAL,
            ),
            full_interval: secs_or(layer.full_interval_secs, DEFAULT_FULL_INTERVAL),
            probe_timeout: secs_or(layer.probe_timeout_secs, DEFAULT_PROBE_TIMEOUT),
            request_timeout: secs_or(layer.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT),
            connect_timeout: secs_or(layer.connect_timeout_secs, DEFAULT_CONNECT_TIMEOUT),
            worker_pool_size: layer.worker_pool_size.unwrap_or(DEFAULT_WORKER_POOL_SIZE),
            queue_capacity: layer.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("probe interval", self.probe_interval),
            ("incremental interval", self.incremental_interval),
            ("full interval", self.full_interval),
            ("probe timeout", self.probe_timeout),
            ("request timeout", self.request_timeout),
            ("connect timeout", self.connect_timeout),
        ];
        for (label, duration) in durations {
            if duration.is_zero() {
                return Err(ConfigError::Invalid(format!("{label} must be > 0")));
            }
        }

        if self.full_interval <= self.incremental_interval {
            return Err(ConfigError::Invalid(
                "full interval must be longer than incremental interval".to_string(),
            ));
        }
        if !(1..=MAX_WORKER_POOL_SIZE).contains(&self.worker_pool_size) {
            return Err(ConfigError::Invalid(format!(
                "worker pool size must be in [1, {MAX_WORKER_POOL_SIZE}]"
            )));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "queue capacity must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Render back into a file layer (e.g. for `config show`).
    pub fn to_file(&self) -> ConfigFile {
        ConfigFile {
            primary_url: Some(self.endpoint.primary().to_string()),
            backup_url: Some(self.endpoint.backup().to_string()),
            auth_token: self.auth_token.clone(),
            probe_interval_secs: Some(self.probe_interval.as_secs()),
            incremental_interval_secs: Some(self.incremental_interval.as_secs()),
            full_interval_secs: Some(self.full_interval.as_secs()),
            probe_timeout_secs: Some(self.probe_timeout.as_secs()),
            request_timeout_secs: Some(self.request_timeout.as_secs()),
            connect_timeout_secs: Some(self.connect_timeout.as_secs()),
            worker_pool_size: Some(self.worker_pool_size),
            queue_capacity: Some(self.queue_capacity),
        }
    }
}

fn secs_or(value: Option<u64>, default: Duration) -> Duration {
    value.map_or(default, Duration::from_secs)
}

fn parse_number<T: std::str::FromStr>(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, ConfigError> {
    let Some(raw) = normalize_text_option(lookup(name)) else {
        return Ok(None);
    };
    raw.parse::<T>()
        .map(Some)
        .map_err(|_| ConfigError::Invalid(format!("{name} must be a non-negative integer")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lookup_from<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        move |key| map.get(key).map(|value| (*value).to_string())
    }

    fn minimal_layer() -> ConfigFile {
        ConfigFile {
            primary_url: Some("http://10.0.2.2:8080".to_string()),
            backup_url: Some("https://sync.example.com".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn resolve_requires_both_endpoints() {
        let error = CoordinatorConfig::resolve(ConfigFile::default()).unwrap_err();
        assert!(error.to_string().contains("TETHER_PRIMARY_URL"));

        let error = CoordinatorConfig::resolve(ConfigFile {
            primary_url: Some("http://localhost:8080".to_string()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(error.to_string().contains("TETHER_BACKUP_URL"));
    }

    #[test]
    fn resolve_applies_defaults() {
        let config = CoordinatorConfig::resolve(minimal_layer()).unwrap();
        assert_eq!(config.probe_interval, DEFAULT_PROBE_INTERVAL);
        assert_eq!(config.incremental_interval, DEFAULT_INCREMENTAL_INTERVAL);
        assert_eq!(config.full_interval, DEFAULT_FULL_INTERVAL);
        assert_eq!(config.worker_pool_size, DEFAULT_WORKER_POOL_SIZE);
        assert_eq!(config.auth_token, None);
    }

    #[test]
    fn resolve_rejects_full_not_longer_than_incremental() {
        let layer = ConfigFile {
            incremental_interval_secs: Some(600),
            full_interval_secs: Some(600),
            ..minimal_layer()
        };
        let error = CoordinatorConfig::resolve(layer).unwrap_err();
        assert!(error.to_string().contains("full interval"));
    }

    #[test]
    fn resolve_rejects_zero_timeout_and_bad_pool() {
        let zero_timeout = ConfigFile {
            request_timeout_secs: Some(0),
            ..minimal_layer()
        };
        assert!(CoordinatorConfig::resolve(zero_timeout)
            .unwrap_err()
            .to_string()
            .contains("request timeout"));

        let huge_pool = ConfigFile {
            worker_pool_size: Some(1_000),
            ..minimal_layer()
        };
        assert!(CoordinatorConfig::resolve(huge_pool)
            .unwrap_err()
            .to_string()
            .contains("worker pool size"));
    }

    #[test]
    fn from_lookup_parses_numbers_and_trims_text() {
        let layer = ConfigFile::from_lookup(lookup_from(&[
            ("TETHER_PRIMARY_URL", " http://127.0.0.1:8080/ "),
            ("TETHER_AUTH_TOKEN", "  "),
            ("TETHER_PROBE_INTERVAL_SECS", "15"),
            ("TETHER_WORKERS", "2"),
        ]))
        .unwrap();
        assert_eq!(layer.primary_url.as_deref(), Some("http://127.0.0.1:8080/"));
        assert_eq!(layer.auth_token, None);
        assert_eq!(layer.probe_interval_secs, Some(15));
        assert_eq!(layer.worker_pool_size, Some(2));
    }

    #[test]
    fn from_lookup_rejects_non_numeric_interval() {
        let error =
            ConfigFile::from_lookup(lookup_from(&[("TETHER_FULL_INTERVAL_SECS", "hourly")]))
                .unwrap_err();
        assert!(error.to_string().contains("TETHER_FULL_INTERVAL_SECS"));
    }

    #[test]
    fn overlay_prefers_later_layer() {
        let base = ConfigFile {
            probe_interval_secs: Some(60),
            auth_token: Some("file-token".to_string()),
            ..minimal_layer()
        };
        let env = ConfigFile {
            primary_url: Some("http://192.168.1.10:8080".to_string()),
            probe_interval_secs: Some(10),
            ..Default::default()
        };

        let merged = base.overlay(env);
        assert_eq!(merged.primary_url.as_deref(), Some("http://192.168.1.10:8080"));
        assert_eq!(merged.backup_url.as_deref(), Some("https://sync.example.com"));
        assert_eq!(merged.probe_interval_secs, Some(10));
        assert_eq!(merged.auth_token.as_deref(), Some("file-token"));
    }

    #[test]
    fn config_file_roundtrip_normalizes_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let layer = ConfigFile {
            primary_url: Some(" http://10.0.2.2:8080 ".to_string()),
            auth_token: Some(" token ".to_string()),
            full_interval_secs: Some(7_200),
            ..Default::default()
        };
        layer.save_to_path(&path).unwrap();

        let loaded = ConfigFile::load_from_path(&path).unwrap();
        assert_eq!(loaded.primary_url.as_deref(), Some("http://10.0.2.2:8080"));
        assert_eq!(loaded.auth_token.as_deref(), Some("token"));
        assert_eq!(loaded.full_interval_secs, Some(7_200));
        assert_eq!(loaded.backup_url, None);
    }

    #[test]
    fn config_file_rejects_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "primary_url": "http://x", "retry": 3 }"#).unwrap();

        let error = ConfigFile::load_from_path(&path).unwrap_err();
        assert!(error.to_string().contains("unknown field"));
    }

    #[test]
    fn missing_config_file_is_empty_layer() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = ConfigFile::load_from_path(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded, ConfigFile::default());
    }

    #[test]
    fn builders_set_token_and_timeouts() {
        let config = CoordinatorConfig::resolve(minimal_layer())
            .unwrap()
            .with_auth_token("  device-token ")
            .with_timeouts(Duration::from_secs(2), Duration::from_secs(20));
        assert_eq!(config.auth_token.as_deref(), Some("device-token"));
        assert_eq!(config.probe_timeout, Duration::from_secs(2));
        assert_eq!(config.request_timeout, Duration::from_secs(20));
        assert!(config.validate().is_ok());

        assert_eq!(config.with_auth_token("   ").auth_token, None);
    }

    #[test]
    fn debug_output_redacts_auth_token() {
        let config = CoordinatorConfig::resolve(ConfigFile {
            auth_token: Some("sensitive-bearer".to_string()),
            ..minimal_layer()
        })
        .unwrap();

        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("sensitive-bearer"));
        assert!(debug_output.contains("[REDACTED]"));
        assert_eq!(
            config.to_file().redacted().auth_token.as_deref(),
            Some("[REDACTED]")
        );
    }
}
