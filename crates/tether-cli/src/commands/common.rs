use std::path::PathBuf;

use tether_core::config::ConfigFile;
use tether_core::models::CallResult;
use tether_core::probe::ProbeReport;
use tether_core::{CoordinatorConfig, JobReport};

use crate::error::CliError;

/// Values passed as global CLI flags. They win over every other layer.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub primary_url: Option<String>,
    pub backup_url: Option<String>,
}

impl ConfigOverrides {
    fn to_layer(&self) -> ConfigFile {
        ConfigFile {
            primary_url: self.primary_url.clone(),
            backup_url: self.backup_url.clone(),
            ..ConfigFile::default()
        }
    }
}

/// Where the CLI reads its settings from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    path: Option<PathBuf>,
    overrides: ConfigOverrides,
}

impl ConfigSource {
    pub const fn new(path: Option<PathBuf>, overrides: ConfigOverrides) -> Self {
        Self { path, overrides }
    }

    pub fn path(&self) -> Result<PathBuf, CliError> {
        self.path
            .clone()
            .or_else(default_config_path)
            .ok_or(CliError::NoConfigDir)
    }

    /// Config file only, without environment or flag layers.
    pub fn file_layer(&self) -> Result<ConfigFile, CliError> {
        Ok(ConfigFile::load_from_path(&self.path()?)?)
    }

    /// Config file, then `layer`, then CLI flags.
    pub fn layered_with(&self, layer: ConfigFile) -> Result<ConfigFile, CliError> {
        Ok(self
            .file_layer()?
            .overlay(layer)
            .overlay(self.overrides.to_layer()))
    }

    pub fn resolve(&self) -> Result<CoordinatorConfig, CliError> {
        let layer = self.layered_with(ConfigFile::from_env()?)?;
        Ok(CoordinatorConfig::resolve(layer)?)
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tether").join("config.json"))
}

pub fn format_report_lines(report: &JobReport) -> Vec<String> {
    let mut lines = vec![format!(
        "[{}] {}",
        format_sync_timestamp(report.finished_at),
        report.summary()
    )];
    for call in &report.calls {
        let detail = match &call.result {
            CallResult::Success { status } => format!("ok    {status}"),
            CallResult::Rejected { status } => format!("fail  {status}"),
            CallResult::Failed { error } => format!("fail  {error}"),
        };
        lines.push(format!("  {} {}  {detail}", call.method, call.url));
    }
    lines
}

pub fn format_probe_line(report: &ProbeReport) -> String {
    let state = if report.reachable { "online" } else { "offline" };
    match (&report.status, &report.error) {
        (Some(status), _) => format!("{state}: {} returned {status}", report.url),
        (None, Some(error)) => format!("{state}: {} {error}", report.url),
        (None, None) => format!("{state}: {}", report.url),
    }
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}
