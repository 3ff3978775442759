// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Envelope assembly.
//!
//! Every entry point (manual capture, panic hook, unobserved task failure,
//! request instrumentation, error boundary) produces a raw report; the core
//! enriches it with identity, environment, a copy of the breadcrumb buffer,
//! and load/memory figures, then hands it to the relay. Assembly does no I/O.

use serde_json::{Map, Value};
use std::sync::PoisonError;

use tracing::debug;

use crate::types::{
    iso_timestamp, BrowserInfo, Channel, EnvelopeBase, ErrorEvent, ErrorKind, PerformanceMetric,
    Severity,
};

use super::AgentCore;

/// Raw error fields supplied by a producer.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub severity: Severity,
    pub message: String,
    pub stack: Option<String>,
    pub extra: Option<Value>,
    pub component_stack: Option<String>,
    pub filename: Option<String>,
    pub lineno: Option<u32>,
    pub colno: Option<u32>,
}

impl ErrorReport {
    pub fn new(kind: ErrorKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            stack: None,
            extra: None,
            component_stack: None,
            filename: None,
            lineno: None,
            colno: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn with_extra(mut self, extra: Value) -> Self {
        self.extra = Some(extra);
        self
    }

    pub fn with_component_stack(mut self, component_stack: impl Into<String>) -> Self {
        self.component_stack = Some(component_stack.into());
        self
    }

    /// Source location of an uncaught failure.
    pub fn with_location(mut self, filename: impl Into<String>, line: u32, column: u32) -> Self {
        self.filename = Some(filename.into());
        self.lineno = Some(line);
        self.colno = Some(column);
        self
    }
}

/// Raw timing fields supplied by a producer.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceReport {
    pub kind: String,
    pub duration_ms: u64,
    pub request_url: Option<String>,
    pub metrics: Map<String, Value>,
}

impl PerformanceReport {
    pub fn new(kind: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            kind: kind.into(),
            duration_ms,
            request_url: None,
            metrics: Map::new(),
        }
    }

    pub fn with_request_url(mut self, url: impl Into<String>) -> Self {
        self.request_url = Some(url.into());
        self
    }

    pub fn with_metrics(mut self, metrics: Map<String, Value>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_metric(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metrics.insert(key.into(), value.into());
        self
    }
}

/// Message and cause chain of an error. The chain stands in for a stack.
pub(crate) fn describe_error(error: &(dyn std::error::Error + 'static)) -> (String, Option<String>) {
    let mut causes = Vec::new();
    let mut source = error.source();
    while let Some(cause) = source {
        causes.push(format!("caused by: {}", cause));
        source = cause.source();
    }
    let chain = (!causes.is_empty()).then(|| causes.join("\n"));
    (error.to_string(), chain)
}

impl AgentCore {
    /// Fields shared by every envelope, read fresh from identity and host.
    pub(crate) fn envelope_base(&self) -> EnvelopeBase {
        let (user_id, session_id) = {
            let identity = self.identity.read().unwrap_or_else(PoisonError::into_inner);
            (identity.user_id().to_string(), identity.session_id().to_string())
        };

        EnvelopeBase {
            timestamp: iso_timestamp(),
            url: self.host.current_url(),
            user_agent: self.host.user_agent(),
            browser_info: BrowserInfo::detect(self.host.as_ref()),
            user_id,
            session_id,
        }
    }

    /// Page load duration in milliseconds, if the host knows it.
    pub(crate) fn page_load_time(&self) -> Option<u64> {
        self.host.navigation_timing().map(|t| t.load_ms)
    }

    /// Memory estimate in whole megabytes, if the host knows it.
    pub(crate) fn memory_usage_mb(&self) -> Option<u64> {
        self.host
            .memory_usage_bytes()
            .map(|bytes| (bytes as f64 / 1024.0 / 1024.0).round() as u64)
    }

    pub(crate) fn assemble_error(&self, report: ErrorReport) -> ErrorEvent {
        let scope = self.scope.read().unwrap_or_else(PoisonError::into_inner).clone();

        ErrorEvent {
            kind: report.kind,
            message: report.message,
            stack: report.stack,
            severity: report.severity,
            extra_data: report.extra,
            component_stack: report.component_stack,
            filename: report.filename,
            lineno: report.lineno,
            colno: report.colno,
            base: self.envelope_base(),
            breadcrumbs: self.breadcrumbs.snapshot(),
            page_load_time: self.page_load_time(),
            memory_usage: self.memory_usage_mb(),
            tags: scope.tags,
            contexts: scope.contexts,
            user: scope.user,
        }
    }

    pub(crate) fn assemble_metric(&self, report: PerformanceReport) -> PerformanceMetric {
        PerformanceMetric {
            kind: report.kind,
            duration: report.duration_ms,
            request_url: report.request_url,
            metrics: report.metrics,
            base: self.envelope_base(),
        }
    }

    /// Assemble an error envelope and hand it to the relay.
    pub(crate) fn capture_error(&self, report: ErrorReport) {
        if !self.enabled {
            return;
        }

        let event = self.assemble_error(report);
        debug!(
            kind = %event.kind,
            severity = %event.severity,
            message = %event.message,
            breadcrumbs = event.breadcrumbs.len(),
            "Captured error"
        );
        self.relay.send(Channel::Error, &event);
    }

    /// Assemble a performance envelope and hand it to the relay.
    pub(crate) fn track_performance(&self, report: PerformanceReport) {
        if !self.enabled {
            return;
        }

        let metric = self.assemble_metric(report);
        debug!(kind = %metric.kind, duration_ms = metric.duration, "Tracked performance metric");
        self.relay.send(Channel::Performance, &metric);
    }
}
