// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Core types for the Pulse telemetry agent.
//!
//! This module defines the wire model shared by every component: breadcrumbs,
//! the three envelope kinds (error, performance, session), and the relay
//! channels they travel on. Field names serialize exactly as the collector
//! expects them (camelCase, with a few historical snake_case keys).

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Current UTC time as an ISO-8601 string with millisecond precision.
pub fn iso_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ============================================================================
// Breadcrumbs
// ============================================================================

/// A breadcrumb as supplied by the caller, before it is timestamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreadcrumbInput {
    #[serde(rename = "type")]
    pub kind: String,
    pub category: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

impl BreadcrumbInput {
    /// Create a breadcrumb without extra data.
    pub fn new(
        kind: impl Into<String>,
        category: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            category: category.into(),
            message: message.into(),
            data: None,
        }
    }

    /// Attach a key-value payload.
    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = Some(data);
        self
    }
}

/// A recorded breadcrumb.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub category: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

impl Breadcrumb {
    /// Stamp an input with the current time.
    pub fn stamp(input: BreadcrumbInput) -> Self {
        Self {
            timestamp: iso_timestamp(),
            kind: input.kind,
            category: input.category,
            message: input.message,
            data: input.data,
        }
    }
}

/// The element a click breadcrumb describes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickTarget {
    pub tag_name: String,
    pub class_name: Option<String>,
    pub id: Option<String>,
    pub text: Option<String>,
}

impl ClickTarget {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            ..Default::default()
        }
    }
}

// ============================================================================
// Error taxonomy
// ============================================================================

/// Origin of a captured error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Uncaught runtime failure, unobserved task failure, or manual capture.
    /// Serialized as `javascript` for collector compatibility.
    Javascript,
    /// Failed outbound network call.
    Api,
    /// UI rendering failure reported by an error boundary.
    Render,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Javascript => "javascript",
            Self::Api => "api",
            Self::Render => "render",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity attached by the producer of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Environment snapshot
// ============================================================================

/// Physical screen metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenInfo {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub color_depth: Option<u32>,
}

/// Visible viewport size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Derived description of the client environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserInfo {
    pub browser: String,
    pub os: String,
    pub device: String,
    pub language: Option<String>,
    pub cookie_enabled: bool,
    #[serde(rename = "onLine")]
    pub on_line: bool,
    pub screen: ScreenInfo,
    pub viewport: Viewport,
}

/// Page navigation timings, in milliseconds from the start of the load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigationTiming {
    pub load_ms: u64,
    pub dom_content_loaded_ms: Option<u64>,
    pub first_paint_ms: Option<u64>,
    pub first_contentful_paint_ms: Option<u64>,
}

// ============================================================================
// Envelopes
// ============================================================================

/// Fields shared by error and performance envelopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeBase {
    pub timestamp: String,
    pub url: String,
    pub user_agent: String,
    pub browser_info: BrowserInfo,
    pub user_id: String,
    pub session_id: String,
}

/// Application-supplied user context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A fully enriched error envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEvent {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    pub severity: Severity,
    #[serde(rename = "extra_data", default, skip_serializing_if = "Option::is_none")]
    pub extra_data: Option<Value>,
    #[serde(rename = "component_stack", default, skip_serializing_if = "Option::is_none")]
    pub component_stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lineno: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colno: Option<u32>,
    #[serde(flatten)]
    pub base: EnvelopeBase,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub page_load_time: Option<u64>,
    pub memory_usage: Option<u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub contexts: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserContext>,
}

/// A timing measurement envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetric {
    #[serde(rename = "type")]
    pub kind: String,
    pub duration: u64,
    /// Address of the measured call, when the metric describes a request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_url: Option<String>,
    pub metrics: Map<String, Value>,
    #[serde(flatten)]
    pub base: EnvelopeBase,
}

/// Emitted once when a session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStart {
    pub session_id: String,
    pub user_id: String,
    pub user_agent: String,
    pub browser_info: BrowserInfo,
    pub start_time: String,
    pub url: String,
}

/// Periodic liveness update for an active session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    pub session_id: String,
    pub last_activity: String,
    pub current_url: String,
}

// ============================================================================
// Relay channels
// ============================================================================

/// Collector channel an envelope is posted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Error,
    Performance,
    Session,
    SessionUpdate,
}

impl Channel {
    /// Path segment under the collector base.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Performance => "performance",
            Self::Session => "session",
            Self::SessionUpdate => "session-update",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
