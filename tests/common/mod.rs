// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use pulse::config::{Environment, ResolvedConfig};
use pulse::host::StaticHost;
use pulse::identity::{KeyValueStore, MemoryStore};
use pulse::{HttpClient, HttpRequest, HttpResponse, TelemetryAgent, TransportError};

/// An `HttpClient` that records every request it receives.
///
/// Answers with a fixed status after an optional delay, or fails every call
/// with a network error.
pub struct RecordingClient {
    requests: Mutex<Vec<HttpRequest>>,
    status: u16,
    fail: bool,
    delay: Option<Duration>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            status: 200,
            fail: false,
            delay: None,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }

    /// Requests whose URL ends with `suffix`, with their JSON bodies.
    pub fn bodies_for(&self, suffix: &str) -> Vec<Value> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.ends_with(suffix))
            .map(|r| serde_json::from_slice(r.body.as_deref().unwrap_or(b"null")).unwrap())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Wait until at least `n` requests have arrived.
    pub async fn wait_for(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.count() < n {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("timed out waiting for requests");
    }
}

#[async_trait]
impl HttpClient for RecordingClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(TransportError::Network("connection refused".to_string()));
        }
        Ok(HttpResponse::new(self.status))
    }
}

pub const PAGE_URL: &str = "https://app.example.com/";
pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0 Safari/537.36";

/// Test-environment config with the panic hook off.
pub fn test_config() -> ResolvedConfig {
    let mut config = ResolvedConfig::for_environment(Environment::Test);
    config.capture_panics = false;
    config
}

pub fn build_agent(
    config: ResolvedConfig,
    store: Arc<dyn KeyValueStore>,
    client: Arc<RecordingClient>,
) -> TelemetryAgent {
    TelemetryAgent::builder(config)
        .host(Arc::new(StaticHost::new(PAGE_URL, USER_AGENT)))
        .storage(store)
        .client(client)
        .build()
        .unwrap()
}

/// Agent with a fresh in-memory store.
pub fn agent(client: Arc<RecordingClient>) -> TelemetryAgent {
    build_agent(test_config(), Arc::new(MemoryStore::new()), client)
}

/// Wait for the relay to settle its in-flight call.
pub async fn settle(agent: &TelemetryAgent) {
    let target = agent.relay_stats().dispatched;
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let stats = agent.relay_stats();
            if stats.delivered + stats.failed >= target {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("relay did not settle");
}
