//! Out-of-band bearer token shared by every outbound call.

use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::util::normalize_text_option;

/// Bearer token that can be set or cleared while jobs are running.
///
/// Each call reads the token when it is built, so a change applies to the
/// next call, including later calls of a job already in flight.
#[derive(Clone, Default)]
pub struct AuthToken {
    inner: Arc<RwLock<Option<String>>>,
}

impl AuthToken {
    pub fn new(token: Option<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(normalize_text_option(token))),
        }
    }

    /// Replace the token; blank values clear it.
    pub async fn set(&self, token: impl Into<String>) {
        *self.inner.write().await = normalize_text_option(Some(token.into()));
    }

    pub async fn clear(&self) {
        *self.inner.write().await = None;
    }

    pub async fn get(&self) -> Option<String> {
        self.inner.read().await.clone()
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthToken")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blank_token_is_treated_as_unset() {
        let token = AuthToken::new(Some("   ".to_string()));
        assert_eq!(token.get().await, None);

        token.set("abc").await;
        assert_eq!(token.get().await.as_deref(), Some("abc"));

        token.set(" ").await;
        assert_eq!(token.get().await, None);
    }

    #[tokio::test]
    async fn clones_share_the_token() {
        let token = AuthToken::default();
        let reader = token.clone();

        token.set("shared").await;
        assert_eq!(reader.get().await.as_deref(), Some("shared"));

        reader.clear().await;
        assert_eq!(token.get().await, None);
    }

    #[test]
    fn debug_redacts_token() {
        let token = AuthToken::new(Some("secret".to_string()));
        let debug = format!("{token:?}");
        assert!(!debug.contains("secret"));
    }
}
