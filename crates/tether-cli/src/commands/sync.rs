use std::sync::Arc;

use tether_core::auth::AuthToken;
use tether_core::connectivity::ConnectivityHandle;
use tether_core::dispatcher::RequestDispatcher;
use tether_core::transport::ReqwestTransport;
use tether_core::{EndpointRole, SyncJob};

use crate::commands::common::{format_probe_line, format_report_lines, ConfigSource};
use crate::commands::probe::probe_primary;
use crate::error::CliError;

pub async fn run_sync(
    source: &ConfigSource,
    job: SyncJob,
    offline: bool,
    as_json: bool,
) -> Result<(), CliError> {
    let config = source.resolve()?;
    let (connectivity, _actor) = ConnectivityHandle::spawn();

    let role = if offline {
        EndpointRole::Backup
    } else {
        let probe = probe_primary(&config, connectivity.clone()).await?;
        if !as_json {
            println!("{}", format_probe_line(&probe));
        }
        EndpointRole::for_connectivity(probe.reachable)
    };

    let dispatcher = RequestDispatcher::new(
        Arc::new(ReqwestTransport::new(config.connect_timeout)?),
        config.endpoint.clone(),
        connectivity,
        AuthToken::new(config.auth_token.clone()),
        config.request_timeout,
    );
    let report = dispatcher.dispatch_to(job, role).await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_report_lines(&report) {
            println!("{line}");
        }
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::JobFailed {
            failed: report.failed(),
            total: report.calls.len(),
        })
    }
}
