//! Job report model

use serde::{Deserialize, Serialize};

use super::{EndpointRole, HttpMethod, JobId, SyncDomain, SyncJob};
use crate::transport::{TransportError, TransportResult};

/// Result of one outbound call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CallResult {
    /// 2xx response
    Success { status: u16 },
    /// Any non-2xx response
    Rejected { status: u16 },
    /// No response at all (timeout, refused, ...)
    Failed { error: TransportError },
}

impl CallResult {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

impl From<TransportResult> for CallResult {
    fn from(result: TransportResult) -> Self {
        match result {
            Ok(response) if response.is_success() => Self::Success {
                status: response.status,
            },
            Ok(response) => Self::Rejected {
                status: response.status,
            },
            Err(error) => Self::Failed { error },
        }
    }
}

/// Outcome of one call within a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallOutcome {
    pub domain: Option<SyncDomain>,
    pub method: HttpMethod,
    pub url: String,
    pub result: CallResult,
}

/// Ordered per-call outcomes of one job run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    pub id: JobId,
    pub job: SyncJob,
    /// Endpoint chosen once, at dispatch time
    pub endpoint: EndpointRole,
    /// Unix ms
    pub started_at: i64,
    /// Unix ms
    pub finished_at: i64,
    pub calls: Vec<CallOutcome>,
}

impl JobReport {
    pub fn succeeded(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| call.result.is_success())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.calls.len() - self.succeeded()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub const fn duration_ms(&self) -> i64 {
        self.finished_at.saturating_sub(self.started_at)
    }

    /// One-line human summary, e.g. `full via primary: 4/5 ok (120ms)`.
    pub fn summary(&self) -> String {
        format!(
            "{} via {}: {}/{} ok ({}ms)",
            self.job,
            self.endpoint,
            self.succeeded(),
            self.calls.len(),
            self.duration_ms()
        )
    }
}
