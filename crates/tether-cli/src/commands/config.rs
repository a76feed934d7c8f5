use tether_core::config::ConfigFile;
use tether_core::CoordinatorConfig;

use crate::cli::ConfigCommands;
use crate::commands::common::ConfigSource;
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, source: &ConfigSource) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show { json } => run_config_show(source, json),
        ConfigCommands::Path => {
            println!("{}", source.path()?.display());
            Ok(())
        }
        ConfigCommands::Init {
            auth_token,
            probe_interval,
            incremental_interval,
            full_interval,
            workers,
        } => {
            let update = ConfigFile {
                auth_token,
                probe_interval_secs: probe_interval,
                incremental_interval_secs: incremental_interval,
                full_interval_secs: full_interval,
                worker_pool_size: workers,
                ..ConfigFile::default()
            };
            run_config_init(source, update)
        }
    }
}

fn run_config_show(source: &ConfigSource, as_json: bool) -> Result<(), CliError> {
    let resolved = source.resolve()?.to_file().redacted();

    if as_json {
        println!("{}", serde_json::to_string_pretty(&resolved)?);
        return Ok(());
    }

    for line in format_config_lines(&resolved) {
        println!("{line}");
    }
    Ok(())
}

/// Merge `update` and the global URL flags into the stored file, validate the
/// result, then write it back.
pub fn run_config_init(source: &ConfigSource, update: ConfigFile) -> Result<(), CliError> {
    let path = source.path()?;
    let merged = source.layered_with(update)?;
    CoordinatorConfig::resolve(merged.clone())?;

    merged.save_to_path(&path)?;
    println!("Saved config to {}", path.display());
    Ok(())
}

pub fn format_config_lines(config: &ConfigFile) -> Vec<String> {
    let text = |value: &Option<String>| value.clone().unwrap_or_else(|| "(unset)".to_string());
    let number = |value: Option<u64>| value.map_or_else(|| "(unset)".to_string(), |v| v.to_string());

    vec![
        format!("primary_url               = {}", text(&config.primary_url)),
        format!("backup_url                = {}", text(&config.backup_url)),
        format!("auth_token                = {}", text(&config.auth_token)),
        format!("probe_interval_secs       = {}", number(config.probe_interval_secs)),
        format!(
            "incremental_interval_secs = {}",
            number(config.incremental_interval_secs)
        ),
        format!("full_interval_secs        = {}", number(config.full_interval_secs)),
        format!("probe_timeout_secs        = {}", number(config.probe_timeout_secs)),
        format!("request_timeout_secs      = {}", number(config.request_timeout_secs)),
        format!("connect_timeout_secs      = {}", number(config.connect_timeout_secs)),
        format!(
            "worker_pool_size          = {}",
            number(config.worker_pool_size.map(|size| size as u64))
        ),
        format!(
            "queue_capacity            = {}",
            number(config.queue_capacity.map(|size| size as u64))
        ),
    ]
}
