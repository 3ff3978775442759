// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Request timing decorator for [`HttpClient`].
//!
//! [`InstrumentedClient`] wraps the application's client once, at
//! composition time. Every call is timed and reported: an `api_call`
//! performance metric on completion, an `api` error event on transport
//! failure. The wrapped call's response and error reach the caller
//! untouched.
//!
//! Calls addressed to the collector are passed straight through. Measuring
//! them would make every relay call produce another envelope.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Weak;

use tokio::time::Instant;
use tracing::trace;

use crate::agent::{AgentCore, ErrorReport, PerformanceReport};
use crate::error::TransportError;
use crate::transport::{HttpClient, HttpRequest, HttpResponse};
use crate::types::{ErrorKind, Severity};

/// An [`HttpClient`] that reports timing for every non-collector call.
pub struct InstrumentedClient<C> {
    inner: C,
    agent: Weak<AgentCore>,
    collector_marker: String,
}

impl<C: HttpClient> InstrumentedClient<C> {
    pub(crate) fn new(inner: C, agent: Weak<AgentCore>, collector_endpoint: &str) -> Self {
        Self {
            inner,
            agent,
            collector_marker: collector_marker(collector_endpoint),
        }
    }

    /// Whether `url` addresses the collector and must bypass instrumentation.
    pub fn is_collector_url(&self, url: &str) -> bool {
        url.contains(&self.collector_marker)
    }

    /// The wrapped client.
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

/// Path of the collector endpoint with a trailing slash, e.g.
/// `/api/v1/error-tracking/`. Matching on the path keeps relative and
/// absolute addresses of the collector excluded alike.
fn collector_marker(endpoint: &str) -> String {
    let path = match reqwest::Url::parse(endpoint) {
        Ok(url) => url.path().to_string(),
        Err(_) => endpoint.to_string(),
    };
    format!("{}/", path.trim_end_matches('/'))
}

#[async_trait]
impl<C: HttpClient> HttpClient for InstrumentedClient<C> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let start = Instant::now();

        if self.is_collector_url(&request.url) {
            trace!(url = %request.url, "Collector request; skipping instrumentation");
            return self.inner.execute(request).await;
        }

        let url = request.url.clone();
        let result = self.inner.execute(request).await;
        let duration = start.elapsed().as_millis() as u64;

        let Some(agent) = self.agent.upgrade() else {
            return result;
        };

        match &result {
            Ok(response) => {
                let mut metrics = Map::new();
                metrics.insert("status".to_string(), Value::from(response.status));
                metrics.insert("ok".to_string(), Value::from(response.ok()));
                agent.track_performance(
                    PerformanceReport::new("api_call", duration)
                        .with_request_url(url)
                        .with_metrics(metrics),
                );
            }
            Err(err) => {
                agent.capture_error(
                    ErrorReport::new(
                        ErrorKind::Api,
                        Severity::Medium,
                        format!("API call failed: {}", err),
                    )
                    .with_extra(json!({ "url": url, "duration": duration })),
                );
            }
        }

        result
    }
}
