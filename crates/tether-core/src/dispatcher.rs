//! Request dispatch for sync jobs.
//!
//! A job reads connectivity once, picks the primary or backup base URL, then
//! issues its fixed call list in order. Calls are independent: a failed call
//! is recorded and the next one is still issued. Nothing is retried.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::AuthToken;
use crate::connectivity::ConnectivityHandle;
use crate::error::Result;
use crate::models::{CallOutcome, CallResult, Endpoint, EndpointRole, JobId, JobReport, SyncJob};
use crate::transport::{HttpRequest, Transport};
use crate::util::unix_timestamp_millis;

pub struct RequestDispatcher<T: Transport> {
    transport: Arc<T>,
    endpoint: Endpoint,
    connectivity: ConnectivityHandle,
    auth_token: AuthToken,
    request_timeout: Duration,
}

impl<T: Transport> Clone for RequestDispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            endpoint: self.endpoint.clone(),
            connectivity: self.connectivity.clone(),
            auth_token: self.auth_token.clone(),
            request_timeout: self.request_timeout,
        }
    }
}

impl<T: Transport> RequestDispatcher<T> {
    pub const fn new(
        transport: Arc<T>,
        endpoint: Endpoint,
        connectivity: ConnectivityHandle,
        auth_token: AuthToken,
        request_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            endpoint,
            connectivity,
            auth_token,
            request_timeout,
        }
    }

    /// Run `job` against the endpoint chosen by the last probe result.
    pub async fn dispatch(&self, job: SyncJob) -> Result<JobReport> {
        let online = self.connectivity.is_online().await?;
        Ok(self
            .dispatch_to(job, EndpointRole::for_connectivity(online))
            .await)
    }

    /// Run `job` against an explicitly chosen endpoint.
    pub async fn dispatch_to(&self, job: SyncJob, role: EndpointRole) -> JobReport {
        let id = JobId::new();
        let base_url = self.endpoint.base_url(role);
        let started_at = unix_timestamp_millis();
        tracing::debug!(job = %job, %id, endpoint = %role, "Dispatching job");

        let mut calls = Vec::new();
        for spec in job.calls() {
            let url = spec.url(base_url);
            let request = HttpRequest {
                method: spec.method,
                url: url.clone(),
                bearer_token: self.auth_token.get().await,
                timeout: self.request_timeout,
            };

            let result = CallResult::from(self.transport.execute(request).await);
            match &result {
                CallResult::Success { status } => {
                    tracing::debug!(%id, %url, status, "Call succeeded");
                }
                CallResult::Rejected { status } => {
                    tracing::warn!(%id, %url, status, "Call rejected by server");
                }
                CallResult::Failed { error } => {
                    tracing::warn!(%id, %url, %error, "Call failed");
                }
            }

            calls.push(CallOutcome {
                domain: spec.domain,
                method: spec.method,
                url,
                result,
            });
        }

        let report = JobReport {
            id,
            job,
            endpoint: role,
            started_at,
            finished_at: unix_timestamp_millis(),
            calls,
        };
        tracing::info!(%id, "Job finished: {}", report.summary());
        report
    }
}
