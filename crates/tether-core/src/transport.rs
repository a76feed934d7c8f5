//! Outbound HTTP transport.
//!
//! Everything above this module only sees a status code or a classified
//! [`TransportError`]; response bodies are never parsed.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::HttpMethod;
use crate::util::compact_text;

const EMPTY_JSON_BODY: &str = "{}";

#[derive(Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub bearer_token: Option<String>,
    pub timeout: Duration,
}

impl std::fmt::Debug for HttpRequest {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
}

impl HttpResponse {
    pub const fn is_success(self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Transport-level failure, classified so it can be logged and reported.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request failed: {0}")]
    Other(String),
}

pub type TransportResult = Result<HttpResponse, TransportError>;

/// Issues a single HTTP request and reports only its status.
pub trait Transport: Send + Sync + 'static {
    fn execute(&self, request: HttpRequest) -> impl Future<Output = TransportResult> + Send;
}

/// `reqwest`-backed transport used outside of tests.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(connect_timeout: Duration) -> crate::Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .connect_timeout(connect_timeout)
                .build()?,
        })
    }
}

impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> TransportResult {
        let builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self
                .client
                .post(&request.url)
                .header(CONTENT_TYPE, "application/json")
                .body(EMPTY_JSON_BODY),
        };
        let mut builder = builder
            .header(ACCEPT, "application/json")
            .timeout(request.timeout);
        if let Some(token) = request.bearer_token.as_deref() {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(classify_error)?;
        Ok(HttpResponse {
            status: response.status().as_u16(),
        })
    }
}

fn classify_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_connect() {
        TransportError::Connect(compact_text(&error.to_string()))
    } else {
        TransportError::Other(compact_text(&error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::oneshot;

    use super::*;

    async fn spawn_one_shot_server(status_line: &str) -> (String, oneshot::Receiver<String>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test server");
        let address = listener.local_addr().expect("local address");
        let response = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{{}}"
        );
        let (request_tx, request_rx) = oneshot::channel();

        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut request_buffer = [0_u8; 4096];
                let read = socket.read(&mut request_buffer).await.unwrap_or(0);
                let _ = request_tx.send(String::from_utf8_lossy(&request_buffer[..read]).to_string());
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });

        (format!("http://{address}"), request_rx)
    }

    fn request(method: HttpMethod, url: String, bearer_token: Option<&str>) -> HttpRequest {
        HttpRequest {
            method,
            url,
            bearer_token: bearer_token.map(ToString::to_string),
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn post_sends_json_headers_and_bearer_token() {
        let (base, request_rx) = spawn_one_shot_server("200 OK").await;
        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();

        let response = transport
            .execute(request(
                HttpMethod::Post,
                format!("{base}/api/sync/ai/full"),
                Some("secret-token"),
            ))
            .await
            .expect("request should succeed");
        assert_eq!(response.status, 200);
        assert!(response.is_success());

        let raw = request_rx.await.unwrap().to_ascii_lowercase();
        assert!(raw.starts_with("post /api/sync/ai/full http/1.1"));
        assert!(raw.contains("content-type: application/json"));
        assert!(raw.contains("authorization: bearer secret-token"));
    }

    #[tokio::test]
    async fn get_without_token_omits_authorization() {
        let (base, request_rx) = spawn_one_shot_server("503 Service Unavailable").await;
        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();

        let response = transport
            .execute(request(HttpMethod::Get, format!("{base}/api/status"), None))
            .await
            .expect("non-2xx is still a response");
        assert_eq!(response.status, 503);
        assert!(!response.is_success());

        let raw = request_rx.await.unwrap().to_ascii_lowercase();
        assert!(raw.starts_with("get /api/status http/1.1"));
        assert!(!raw.contains("authorization"));
    }

    #[tokio::test]
    async fn refused_connection_is_classified_as_connect_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let transport = ReqwestTransport::new(Duration::from_secs(2)).unwrap();
        let error = transport
            .execute(request(
                HttpMethod::Get,
                format!("http://{address}/api/status"),
                None,
            ))
            .await
            .expect_err("nothing is listening");
        assert!(matches!(error, TransportError::Connect(_)));
    }

    #[test]
    fn request_debug_redacts_token() {
        let debug = format!(
            "{:?}",
            request(HttpMethod::Get, "http://x".to_string(), Some("secret"))
        );
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
