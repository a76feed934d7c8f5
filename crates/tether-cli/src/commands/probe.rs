use std::sync::Arc;

use tether_core::auth::AuthToken;
use tether_core::connectivity::ConnectivityHandle;
use tether_core::probe::{ConnectivityProbe, ProbeReport};
use tether_core::transport::ReqwestTransport;
use tether_core::CoordinatorConfig;

use crate::commands::common::{format_probe_line, ConfigSource};
use crate::error::CliError;

pub async fn run_probe(source: &ConfigSource, as_json: bool) -> Result<(), CliError> {
    let config = source.resolve()?;
    let (connectivity, _actor) = ConnectivityHandle::spawn();
    let report = probe_primary(&config, connectivity).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", format_probe_line(&report));
    }

    if report.reachable {
        Ok(())
    } else {
        Err(CliError::Unreachable(config.endpoint.primary().to_string()))
    }
}

/// One probe against the primary endpoint, recorded into `connectivity`.
pub async fn probe_primary(
    config: &CoordinatorConfig,
    connectivity: ConnectivityHandle,
) -> Result<ProbeReport, CliError> {
    let transport = ReqwestTransport::new(config.connect_timeout)?;
    let probe = ConnectivityProbe::new(
        Arc::new(transport),
        &config.endpoint,
        config.probe_timeout,
        connectivity,
        AuthToken::new(config.auth_token.clone()),
    );
    Ok(probe.probe_once().await?)
}
