// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Fire-and-forget delivery of envelopes to the collector.
//!
//! The relay allows exactly one call in flight. A `send` issued while another
//! is outstanding is dropped: not queued, not retried. The latch is taken
//! synchronously inside `send` and released by a guard owned by the spawned
//! call, so every exit path (success, failure, timeout, cancellation,
//! panic) clears it.
//!
//! Delivery failures are counted and logged at debug level, never returned.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{debug, trace};

use crate::error::TransportError;
use crate::types::Channel;

use super::{HttpRequest, SharedClient};

/// Delivers envelopes to `<endpoint>/<channel>/`.
pub struct Relay {
    client: SharedClient,
    endpoint: String,
    timeout: Option<Duration>,
    in_flight: Arc<AtomicBool>,
    stats: Arc<RelayStats>,
    runtime: Handle,
}

impl Relay {
    /// Create a relay posting under `endpoint` (no trailing slash).
    pub fn new(
        client: SharedClient,
        endpoint: impl Into<String>,
        timeout: Option<Duration>,
        runtime: Handle,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            timeout,
            in_flight: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(RelayStats::new()),
            runtime,
        }
    }

    /// Collector base, e.g. `https://api.example.com/api/v1/error-tracking`.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Full address for a channel.
    pub fn channel_url(&self, channel: Channel) -> String {
        format!("{}/{}/", self.endpoint, channel.as_str())
    }

    /// Whether a call is outstanding.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> RelayStatsSnapshot {
        self.stats.snapshot()
    }

    /// Post `payload` as JSON to `channel`, unless a call is already in
    /// flight. Returns immediately; the network call runs on the runtime.
    pub fn send<T: Serialize + ?Sized>(&self, channel: Channel, payload: &T) {
        let body = match serde_json::to_vec(payload) {
            Ok(body) => body,
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                debug!(%channel, error = %e, "Failed to serialize envelope");
                return;
            }
        };

        let Some(guard) = InFlightGuard::acquire(&self.in_flight) else {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            debug!(%channel, "Relay busy; dropping envelope");
            return;
        };
        self.stats.dispatched.fetch_add(1, Ordering::Relaxed);

        let request = HttpRequest::post(self.channel_url(channel))
            .header("Content-Type", "application/json")
            .body(body);
        let client = Arc::clone(&self.client);
        let stats = Arc::clone(&self.stats);
        let timeout = self.timeout;

        self.runtime.spawn(async move {
            let _guard = guard;
            let result = match timeout {
                Some(limit) => match tokio::time::timeout(limit, client.execute(request)).await {
                    Ok(result) => result,
                    Err(_) => Err(TransportError::Timeout(limit.as_millis() as u64)),
                },
                None => client.execute(request).await,
            };

            match result {
                Ok(response) if response.ok() => {
                    stats.delivered.fetch_add(1, Ordering::Relaxed);
                    trace!(%channel, status = response.status, "Envelope delivered");
                }
                Ok(response) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    debug!(%channel, status = response.status, "Collector rejected envelope");
                }
                Err(e) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    debug!(%channel, error = %e, "Failed to send envelope to collector");
                }
            }
        });
    }
}

/// Holds the single-flight latch; clears it on drop.
struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl InFlightGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Thread-safe relay counters.
#[derive(Debug, Default)]
pub struct RelayStats {
    dispatched: AtomicU64,
    dropped: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl RelayStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> RelayStatsSnapshot {
        RelayStatsSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time relay counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RelayStatsSnapshot {
    /// Calls handed to the transport.
    pub dispatched: u64,
    /// Sends refused because a call was in flight.
    pub dropped: u64,
    /// Calls answered with a 2xx status.
    pub delivered: u64,
    /// Calls that errored, timed out, got a non-2xx status, or could not be
    /// serialized.
    pub failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{HttpClient, HttpResponse};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct GatedClient {
        gate: Notify,
        urls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl HttpClient for GatedClient {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.urls.lock().unwrap().push(request.url.clone());
            self.gate.notified().await;
            Ok(HttpResponse::new(201))
        }
    }

    struct FailingClient;

    #[async_trait]
    impl HttpClient for FailingClient {
        async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            Err(TransportError::Network("connection refused".to_string()))
        }
    }

    struct HangingClient;

    #[async_trait]
    impl HttpClient for HangingClient {
        async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            std::future::pending().await
        }
    }

    async fn settle(relay: &Relay) {
        while relay.is_in_flight() {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_in_flight_guard_releases_on_drop() {
        let flag = Arc::new(AtomicBool::new(false));
        let guard = InFlightGuard::acquire(&flag).unwrap();
        assert!(InFlightGuard::acquire(&flag).is_none());
        drop(guard);
        assert!(InFlightGuard::acquire(&flag).is_some());
    }

    #[tokio::test]
    async fn test_channel_url() {
        let relay = Relay::new(
            Arc::new(FailingClient),
            "http://localhost:8000/api/v1/error-tracking/",
            None,
            Handle::current(),
        );
        assert_eq!(
            relay.channel_url(Channel::SessionUpdate),
            "http://localhost:8000/api/v1/error-tracking/session-update/"
        );
    }

    #[tokio::test]
    async fn test_single_flight_drops_second_send() {
        let client = Arc::new(GatedClient::default());
        let relay = Relay::new(client.clone(), "http://c/error-tracking", None, Handle::current());

        relay.send(Channel::Error, &serde_json::json!({"n": 1}));
        relay.send(Channel::Error, &serde_json::json!({"n": 2}));
        assert!(relay.is_in_flight());

        // Let the first call reach the transport, then settle it
        while client.urls.lock().unwrap().is_empty() {
            tokio::task::yield_now().await;
        }
        client.gate.notify_one();
        settle(&relay).await;

        assert_eq!(client.urls.lock().unwrap().len(), 1);
        let stats = relay.stats();
        assert_eq!(stats.dispatched, 1);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.delivered, 1);
    }

    #[tokio::test]
    async fn test_failure_releases_latch() {
        let relay = Relay::new(Arc::new(FailingClient), "http://c/e", None, Handle::current());

        relay.send(Channel::Performance, &serde_json::json!({}));
        settle(&relay).await;
        relay.send(Channel::Performance, &serde_json::json!({}));
        settle(&relay).await;

        let stats = relay.stats();
        assert_eq!(stats.dispatched, 2);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.dropped, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_releases_latch() {
        let relay = Relay::new(
            Arc::new(HangingClient),
            "http://c/e",
            Some(Duration::from_secs(5)),
            Handle::current(),
        );

        relay.send(Channel::Session, &serde_json::json!({}));
        assert!(relay.is_in_flight());

        tokio::time::sleep(Duration::from_secs(6)).await;
        settle(&relay).await;

        assert!(!relay.is_in_flight());
        assert_eq!(relay.stats().failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_timeout_holds_latch() {
        let relay = Relay::new(Arc::new(HangingClient), "http://c/e", None, Handle::current());

        relay.send(Channel::Session, &serde_json::json!({}));
        tokio::time::sleep(Duration::from_secs(3600)).await;

        assert!(relay.is_in_flight());
        relay.send(Channel::Error, &serde_json::json!({}));
        assert_eq!(relay.stats().dropped, 1);
    }
}
