//! Endpoint pair model

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_base_url};

/// Which side of the endpoint pair a call was routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointRole {
    Primary,
    Backup,
}

impl EndpointRole {
    /// Role selected for the last observed connectivity state.
    pub const fn for_connectivity(online: bool) -> Self {
        if online {
            Self::Primary
        } else {
            Self::Backup
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Backup => "backup",
        }
    }
}

impl fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary (local) and backup (remote) server base URLs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EndpointParts")]
pub struct Endpoint {
    primary: String,
    backup: String,
}

/// Unvalidated wire form; every deserialized pair goes through [`Endpoint::new`].
#[derive(Deserialize)]
struct EndpointParts {
    primary: String,
    backup: String,
}

impl TryFrom<EndpointParts> for Endpoint {
    type Error = Error;

    fn try_from(parts: EndpointParts) -> Result<Self> {
        Self::new(parts.primary, parts.backup)
    }
}

impl Endpoint {
    /// Build an endpoint pair, normalizing both base URLs.
    pub fn new(primary: impl AsRef<str>, backup: impl AsRef<str>) -> Result<Self> {
        Ok(Self {
            primary: validate_base_url(primary.as_ref(), "primary")?,
            backup: validate_base_url(backup.as_ref(), "backup")?,
        })
    }

    pub fn primary(&self) -> &str {
        &self.primary
    }

    pub fn backup(&self) -> &str {
        &self.backup
    }

    pub fn base_url(&self, role: EndpointRole) -> &str {
        match role {
            EndpointRole::Primary => &self.primary,
            EndpointRole::Backup => &self.backup,
        }
    }
}

fn validate_base_url(raw: &str, label: &str) -> Result<String> {
    let url = normalize_base_url(raw);
    if url.is_empty() {
        return Err(Error::InvalidInput(format!(
            "{label} endpoint must not be empty"
        )));
    }
    if !is_http_url(&url) {
        return Err(Error::InvalidInput(format!(
            "{label} endpoint must include http:// or https://"
        )));
    }
    Ok(url)
}
