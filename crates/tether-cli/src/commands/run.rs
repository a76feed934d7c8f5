use tether_core::SyncCoordinator;
use tokio::sync::broadcast::error::RecvError;

use crate::commands::common::{format_report_lines, ConfigSource};
use crate::error::CliError;

pub async fn run_coordinator(source: &ConfigSource, as_json: bool) -> Result<(), CliError> {
    let config = source.resolve()?;
    let coordinator = SyncCoordinator::connect(config)?;
    let mut reports = coordinator.subscribe();

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
            report = reports.recv() => {
                match report {
                    Ok(report) if as_json => println!("{}", serde_json::to_string(&report)?),
                    Ok(report) => {
                        for line in format_report_lines(&report) {
                            println!("{line}");
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Report output fell behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    let status = coordinator.status().await?;
    coordinator.shutdown().await;
    tracing::info!(
        completed = status.jobs_completed,
        abandoned = status.jobs_abandoned,
        "Coordinator stopped"
    );
    Ok(())
}
