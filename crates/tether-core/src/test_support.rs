//! In-memory transport for exercising dispatch, probe and scheduling logic.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::models::Endpoint;
use crate::transport::{HttpRequest, HttpResponse, Transport, TransportError, TransportResult};

pub const PRIMARY: &str = "http://primary.test";
pub const BACKUP: &str = "http://backup.test";

pub fn endpoint() -> Endpoint {
    Endpoint::new(PRIMARY, BACKUP).expect("valid test endpoint")
}

pub const fn status(code: u16) -> TransportResult {
    Ok(HttpResponse { status: code })
}

pub const fn timeout() -> TransportResult {
    Err(TransportError::Timeout)
}

#[derive(Default)]
struct Script {
    /// Consumed front-to-back before sticky rules apply
    queued: Vec<(String, VecDeque<TransportResult>)>,
    sticky: Vec<(String, TransportResult)>,
    delays: Vec<(String, Duration)>,
    requests: Vec<HttpRequest>,
    in_flight: usize,
    max_in_flight: usize,
}

impl Script {
    fn respond(&mut self, url: &str) -> TransportResult {
        for (suffix, results) in &mut self.queued {
            if url.ends_with(suffix.as_str()) {
                if let Some(result) = results.pop_front() {
                    return result;
                }
            }
        }
        self.sticky
            .iter()
            .rev()
            .find(|(suffix, _)| url.ends_with(suffix.as_str()))
            .map_or(status(200), |(_, result)| result.clone())
    }

    fn delay_for(&self, url: &str) -> Option<Duration> {
        self.delays
            .iter()
            .rev()
            .find(|(fragment, _)| url.contains(fragment.as_str()))
            .map(|(_, delay)| *delay)
    }
}

/// Records every request; answers 200 unless told otherwise.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every request whose URL ends with `suffix` with `result`.
    pub fn always(&self, suffix: &str, result: TransportResult) -> &Self {
        self.lock().sticky.push((suffix.to_string(), result));
        self
    }

    /// Answer the next requests matching `suffix` with `results`, in order.
    pub fn then(&self, suffix: &str, results: impl IntoIterator<Item = TransportResult>) -> &Self {
        self.lock()
            .queued
            .push((suffix.to_string(), results.into_iter().collect()));
        self
    }

    /// Hold every request whose URL contains `fragment` for `delay`.
    pub fn slow(&self, fragment: &str, delay: Duration) -> &Self {
        self.lock().delays.push((fragment.to_string(), delay));
        self
    }

    /// Most requests that were outstanding at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.lock().max_in_flight
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().requests.clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.lock()
            .requests
            .iter()
            .map(|request| request.url.clone())
            .collect()
    }

    pub fn count_matching(&self, fragment: &str) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|request| request.url.contains(fragment))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().expect("script lock poisoned")
    }
}

impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> TransportResult {
        let (result, delay) = {
            let mut script = self.lock();
            let result = script.respond(&request.url);
            let delay = script.delay_for(&request.url);
            script.requests.push(request);
            script.in_flight += 1;
            script.max_in_flight = script.max_in_flight.max(script.in_flight);
            (result, delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.lock().in_flight -= 1;
        result
    }
}
