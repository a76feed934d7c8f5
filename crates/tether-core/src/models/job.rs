//! Sync job model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Route probed to decide whether an endpoint is reachable.
pub const STATUS_PATH: &str = "/api/status";

const FULL_DOMAINS: [SyncDomain; 5] = [
    SyncDomain::Ai,
    SyncDomain::Security,
    SyncDomain::Mining,
    SyncDomain::Package,
    SyncDomain::Monitor,
];

const INCREMENTAL_DOMAINS: [SyncDomain; 3] =
    [SyncDomain::Ai, SyncDomain::Security, SyncDomain::Mining];

/// A unique identifier for one job run, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    /// Create a new unique job ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One scheduled unit of outbound work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncJob {
    /// Push every domain
    Full,
    /// Push the fast-moving domains only
    Incremental,
    /// Reachability check against the primary endpoint
    Probe,
}

impl SyncJob {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Incremental => "incremental",
            Self::Probe => "probe",
        }
    }

    /// Domains touched by this job, in call order.
    pub const fn domains(self) -> &'static [SyncDomain] {
        match self {
            Self::Full => &FULL_DOMAINS,
            Self::Incremental => &INCREMENTAL_DOMAINS,
            Self::Probe => &[],
        }
    }

    /// Whether this job pushes data (and is therefore gated on connectivity).
    pub const fn is_sync(self) -> bool {
        matches!(self, Self::Full | Self::Incremental)
    }

    /// The fixed, ordered list of calls this job issues.
    pub fn calls(self) -> Vec<CallSpec> {
        if self == Self::Probe {
            return vec![CallSpec {
                method: HttpMethod::Get,
                path: STATUS_PATH.to_string(),
                domain: None,
            }];
        }

        self.domains()
            .iter()
            .map(|domain| CallSpec {
                method: HttpMethod::Post,
                path: format!("/api/sync/{}/{}", domain.as_str(), self.as_str()),
                domain: Some(*domain),
            })
            .collect()
    }
}

impl fmt::Display for SyncJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncJob {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "incremental" => Ok(Self::Incremental),
            "probe" => Ok(Self::Probe),
            other => Err(format!("unknown job kind '{other}'")),
        }
    }
}

/// Data domain synchronized with the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncDomain {
    Ai,
    Security,
    Mining,
    Package,
    Monitor,
}

impl SyncDomain {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ai => "ai",
            Self::Security => "security",
            Self::Mining => "mining",
            Self::Package => "package",
            Self::Monitor => "monitor",
        }
    }
}

impl fmt::Display for SyncDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single outbound call, relative to whichever base URL is selected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSpec {
    pub method: HttpMethod,
    /// Path beginning with `/`
    pub path: String,
    pub domain: Option<SyncDomain>,
}

impl CallSpec {
    /// Join this call's path onto a normalized base URL.
    pub fn url(&self, base_url: &str) -> String {
        format!("{base_url}{}", self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn paths(job: SyncJob) -> Vec<String> {
        job.calls().into_iter().map(|call| call.path).collect()
    }

    #[test]
    fn full_job_covers_all_domains_in_order() {
        assert_eq!(
            paths(SyncJob::Full),
            vec![
                "/api/sync/ai/full",
                "/api/sync/security/full",
                "/api/sync/mining/full",
                "/api/sync/package/full",
                "/api/sync/monitor/full",
            ]
        );
        assert!(SyncJob::Full
            .calls()
            .iter()
            .all(|call| call.method == HttpMethod::Post));
    }

    #[test]
    fn incremental_job_covers_fast_domains() {
        assert_eq!(
            paths(SyncJob::Incremental),
            vec![
                "/api/sync/ai/incremental",
                "/api/sync/security/incremental",
                "/api/sync/mining/incremental",
            ]
        );
    }

    #[test]
    fn probe_job_is_single_status_get() {
        let calls = SyncJob::Probe.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, HttpMethod::Get);
        assert_eq!(calls[0].url("http://127.0.0.1:8080"), "http://127.0.0.1:8080/api/status");
        assert!(!SyncJob::Probe.is_sync());
    }

    #[test]
    fn job_kind_parses_case_insensitively() {
        assert_eq!("FULL".parse::<SyncJob>(), Ok(SyncJob::Full));
        assert_eq!(" incremental ".parse::<SyncJob>(), Ok(SyncJob::Incremental));
        assert!("nightly".parse::<SyncJob>().is_err());
    }

    #[test]
    fn job_ids_are_unique() {
        assert_ne!(JobId::new(), JobId::new());
    }
}
