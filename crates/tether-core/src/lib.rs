//! tether-core - Core library for Tether
//!
//! This crate contains the background sync coordinator: the connectivity
//! state actor, the probe, the job scheduler, and the request dispatcher that
//! routes each job to the primary or backup endpoint.

pub mod auth;
pub mod config;
pub mod connectivity;
pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod models;
pub mod probe;
pub mod scheduler;
pub mod transport;
pub mod util;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::CoordinatorConfig;
pub use coordinator::{CoordinatorStatus, SyncCoordinator};
pub use error::{Error, Result};
pub use models::{Endpoint, EndpointRole, JobId, JobReport, SyncDomain, SyncJob};
