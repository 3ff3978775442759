// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Pulse - a client-side telemetry agent.
//!
//! Pulse captures errors, request timings, user breadcrumbs, and session
//! liveness, and relays them to a collector over HTTP. It never raises into
//! the host application: delivery is fire-and-forget and every internal
//! failure is logged and dropped.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`types`] - Wire model (breadcrumbs, error/performance/session envelopes, channels)
//! - [`error`] - Error types and result aliases
//! - [`config`] - Configuration loading and merging
//! - [`logging`] - Tracing subscriber setup for host applications
//! - [`identity`] - Durable user id and per-agent session id
//! - [`breadcrumbs`] - Bounded, insertion-ordered breadcrumb buffer
//! - [`host`] - Environment snapshot source (address, user agent, memory, timing)
//! - [`transport`] - Outbound request primitive and the single-flight relay
//! - [`instrument`] - Request timing decorator with collector self-exclusion
//! - [`agent`] - Capture pipeline, global hooks, heartbeat, and the agent handle
//!
//! # Example
//!
//! ```rust,ignore
//! use pulse::config::{load_config, ConfigOverrides, EnvSource};
//! use pulse::TelemetryAgent;
//!
//! let config = load_config(".".as_ref(), &EnvSource::Process, ConfigOverrides::default())?;
//! let agent = TelemetryAgent::builder(config).build()?;
//! agent.start();
//! ```

pub mod agent;
pub mod breadcrumbs;
pub mod config;
pub mod error;
pub mod host;
pub mod identity;
pub mod instrument;
pub mod logging;
pub mod transport;
pub mod types;

// Re-export commonly used types at crate root
pub use agent::{
    AgentBuilder, AgentSnapshot, ErrorReport, PerformanceReport, SessionState, TelemetryAgent,
};
pub use error::{AgentError, ConfigError, StorageError, TransportError};
pub use instrument::InstrumentedClient;
pub use transport::{HttpClient, HttpRequest, HttpResponse, ReqwestClient, SharedClient};
pub use types::{
    // Breadcrumbs
    Breadcrumb, BreadcrumbInput, ClickTarget,
    // Envelopes
    ErrorEvent, PerformanceMetric, SessionStart, SessionUpdate,
    // Taxonomy
    Channel, ErrorKind, Severity, UserContext,
};

/// Pulse version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
