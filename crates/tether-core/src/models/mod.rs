//! Data models for Tether

mod endpoint;
mod job;
mod report;

pub use endpoint::{Endpoint, EndpointRole};
pub use job::{CallSpec, HttpMethod, JobId, SyncDomain, SyncJob, STATUS_PATH};
pub use report::{CallOutcome, CallResult, JobReport};
