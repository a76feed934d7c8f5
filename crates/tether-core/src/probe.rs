//! Reachability probe for the primary endpoint.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::auth::AuthToken;
use crate::connectivity::{ConnectivityHandle, Transition};
use crate::error::Result;
use crate::models::{Endpoint, HttpMethod, SyncJob, STATUS_PATH};
use crate::scheduler::JobQueue;
use crate::transport::{HttpRequest, Transport, TransportError};

/// Result of one probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeReport {
    pub url: String,
    pub reachable: bool,
    pub status: Option<u16>,
    pub error: Option<TransportError>,
    #[serde(skip)]
    pub transition: Transition,
    /// Whether a catch-up full sync was queued by this probe
    pub catch_up_enqueued: bool,
}

pub struct ConnectivityProbe<T: Transport> {
    transport: Arc<T>,
    status_url: String,
    timeout: Duration,
    connectivity: ConnectivityHandle,
    auth_token: AuthToken,
    catch_up: Option<JobQueue>,
}

impl<T: Transport> ConnectivityProbe<T> {
    pub fn new(
        transport: Arc<T>,
        endpoint: &Endpoint,
        timeout: Duration,
        connectivity: ConnectivityHandle,
        auth_token: AuthToken,
    ) -> Self {
        Self {
            transport,
            status_url: format!("{}{STATUS_PATH}", endpoint.primary()),
            timeout,
            connectivity,
            auth_token,
            catch_up: None,
        }
    }

    /// Queue a full sync whenever the probe flips offline to online.
    #[must_use]
    pub fn with_catch_up(mut self, queue: JobQueue) -> Self {
        self.catch_up = Some(queue);
        self
    }

    /// Probe once and record the result.
    ///
    /// Transport failures are folded into the report; only a stopped
    /// connectivity actor is returned as an error.
    pub async fn probe_once(&self) -> Result<ProbeReport> {
        let request = HttpRequest {
            method: HttpMethod::Get,
            url: self.status_url.clone(),
            bearer_token: self.auth_token.get().await,
            timeout: self.timeout,
        };

        let (reachable, status, error) = match self.transport.execute(request).await {
            Ok(response) if response.is_success() => (true, Some(response.status), None),
            Ok(response) => {
                tracing::debug!(status = response.status, "Probe got non-success status");
                (false, Some(response.status), None)
            }
            Err(error) => {
                tracing::debug!(%error, "Probe failed");
                (false, None, Some(error))
            }
        };

        let transition = self.connectivity.record_probe(reachable).await?;
        let catch_up_enqueued = match (transition, &self.catch_up) {
            (Transition::CameOnline, Some(queue)) => queue.enqueue(SyncJob::Full),
            _ => false,
        };

        Ok(ProbeReport {
            url: self.status_url.clone(),
            reachable,
            status,
            error,
            transition,
            catch_up_enqueued,
        })
    }
}
