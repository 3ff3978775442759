// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Agent module - the telemetry context object.
//!
//! A [`TelemetryAgent`] is built once at application bootstrap and handed to
//! whatever needs to report: error boundaries, request clients, dashboards.
//! Clones share one core, so there is exactly one identity, one breadcrumb
//! buffer and one relay per agent.
//!
//! # Example
//!
//! ```rust,ignore
//! use pulse::agent::TelemetryAgent;
//! use pulse::config::ResolvedConfig;
//! use pulse::types::Severity;
//!
//! let agent = TelemetryAgent::builder(ResolvedConfig::default()).build()?;
//! agent.start();
//!
//! agent.navigate("app://localhost/settings");
//! agent.capture_message("Settings opened", Severity::Info, None);
//!
//! // Time the application's own requests
//! let client = agent.instrument(pulse::transport::ReqwestClient::new()?);
//! ```

mod capture;
mod hooks;
mod session;
mod types;

pub use capture::{ErrorReport, PerformanceReport};
pub use types::{AgentSnapshot, SessionState};

use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::breadcrumbs::BreadcrumbRecorder;
use crate::config::{default_storage_dir, validate, ResolvedConfig};
use crate::error::AgentError;
use crate::host::{Host, ProcessHost};
use crate::identity::{FileStore, Identity, KeyValueStore, MemoryStore};
use crate::instrument::InstrumentedClient;
use crate::transport::{HttpClient, Relay, RelayStatsSnapshot, ReqwestClient, SharedClient};
use crate::types::{
    Breadcrumb, BreadcrumbInput, BrowserInfo, ClickTarget, ErrorKind, Severity, UserContext,
};

use types::Scope;

/// Maximum characters of element text kept in a click breadcrumb.
const CLICK_TEXT_LIMIT: usize = 50;

/// Shared state behind every [`TelemetryAgent`] handle.
pub(crate) struct AgentCore {
    enabled: bool,
    config: ResolvedConfig,
    identity: RwLock<Identity>,
    breadcrumbs: BreadcrumbRecorder,
    host: Arc<dyn Host>,
    relay: Relay,
    scope: RwLock<Scope>,
    session: Mutex<SessionState>,
    heartbeats: AtomicU64,
    heartbeat_task: Mutex<Option<JoinHandle<()>>>,
    runtime: Handle,
}

impl Drop for AgentCore {
    fn drop(&mut self) {
        let task = self
            .heartbeat_task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
    }
}

/// Builder for [`TelemetryAgent`].
pub struct AgentBuilder {
    config: ResolvedConfig,
    host: Option<Arc<dyn Host>>,
    storage: Option<Arc<dyn KeyValueStore>>,
    client: Option<SharedClient>,
    runtime: Option<Handle>,
}

impl AgentBuilder {
    pub fn new(config: ResolvedConfig) -> Self {
        Self {
            config,
            host: None,
            storage: None,
            client: None,
            runtime: None,
        }
    }

    /// Environment source. Defaults to a [`ProcessHost`] at the configured
    /// page URL.
    pub fn host(mut self, host: Arc<dyn Host>) -> Self {
        self.host = Some(host);
        self
    }

    /// Persistent store for the user id. Defaults to a per-origin
    /// [`FileStore`] under the configured storage directory.
    pub fn storage(mut self, storage: Arc<dyn KeyValueStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Client the relay posts with. Defaults to a [`ReqwestClient`].
    ///
    /// Pass the raw client here, not an instrumented one.
    pub fn client(mut self, client: SharedClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Runtime for relay calls and the heartbeat. Defaults to the current
    /// runtime.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Fails on a runtime-less thread or on settings [`validate`] rejects.
    pub fn build(self) -> Result<TelemetryAgent, AgentError> {
        validate(&self.config)?;
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| AgentError::NoRuntime)?,
        };

        let config = self.config;
        let host = match self.host {
            Some(host) => host,
            None => Arc::new(ProcessHost::new(config.page_url.clone())),
        };
        let storage = match self.storage {
            Some(storage) => storage,
            None => default_store(&config),
        };
        let client: SharedClient = match self.client {
            Some(client) => client,
            None => Arc::new(ReqwestClient::new()?),
        };

        let identity = Identity::resolve(storage.as_ref());
        let relay = Relay::new(
            client,
            config.collector_endpoint(),
            config.relay_timeout,
            runtime.clone(),
        );

        debug!(
            environment = %config.environment,
            enabled = config.enabled,
            endpoint = %relay.endpoint(),
            user_id = %identity.user_id(),
            session_id = %identity.session_id(),
            "Telemetry agent built"
        );

        let core = AgentCore {
            enabled: config.enabled,
            breadcrumbs: BreadcrumbRecorder::with_enabled(config.max_breadcrumbs, config.enabled),
            identity: RwLock::new(identity),
            host,
            relay,
            scope: RwLock::new(Scope::default()),
            session: Mutex::new(SessionState::Idle),
            heartbeats: AtomicU64::new(0),
            heartbeat_task: Mutex::new(None),
            runtime,
            config,
        };

        Ok(TelemetryAgent {
            core: Arc::new(core),
        })
    }
}

fn default_store(config: &ResolvedConfig) -> Arc<dyn KeyValueStore> {
    let dir: Option<PathBuf> = config.storage_dir.clone().or_else(default_storage_dir);
    match dir {
        Some(dir) => Arc::new(FileStore::for_origin(&dir, &config.origin)),
        None => {
            warn!("No data directory available; user id will not persist");
            Arc::new(MemoryStore::new())
        }
    }
}

/// Handle to a telemetry agent. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct TelemetryAgent {
    core: Arc<AgentCore>,
}

impl std::fmt::Debug for TelemetryAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryAgent")
            .field("enabled", &self.core.enabled)
            .field("session_id", &self.session_id())
            .field("session_state", &self.session_state())
            .finish()
    }
}

impl TelemetryAgent {
    pub fn builder(config: ResolvedConfig) -> AgentBuilder {
        AgentBuilder::new(config)
    }

    /// Start the session: install the panic hook (if configured), send the
    /// session record, and start the heartbeat.
    ///
    /// Idempotent. A disabled agent stays idle.
    pub fn start(&self) {
        if !self.core.enabled {
            debug!("Telemetry disabled; not starting session");
            return;
        }

        {
            let mut state = self.core.session.lock().unwrap_or_else(PoisonError::into_inner);
            if *state == SessionState::Started {
                return;
            }
            *state = SessionState::Started;
        }

        if self.core.config.capture_panics {
            self.install_panic_hook();
        }

        self.core.send_session_start();

        let task = session::spawn_heartbeat(
            Arc::downgrade(&self.core),
            self.core.config.heartbeat_interval,
            &self.core.runtime,
        );
        *self
            .core
            .heartbeat_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(task);

        info!(
            session_id = %self.session_id(),
            heartbeat_secs = self.core.config.heartbeat_interval.as_secs(),
            "Telemetry session started"
        );
    }

    pub fn is_enabled(&self) -> bool {
        self.core.enabled
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.core.config
    }

    pub fn user_id(&self) -> String {
        self.core
            .identity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .user_id()
            .to_string()
    }

    pub fn session_id(&self) -> String {
        self.core
            .identity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .session_id()
            .to_string()
    }

    pub fn session_state(&self) -> SessionState {
        *self.core.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================================================
    // Breadcrumbs
    // ========================================================================

    pub fn add_breadcrumb(&self, input: BreadcrumbInput) {
        self.core.breadcrumbs.record(input);
    }

    /// Record a click on `target`.
    pub fn record_click(&self, target: &ClickTarget) {
        let mut data = Map::new();
        data.insert("tagName".to_string(), Value::from(target.tag_name.clone()));
        data.insert("className".to_string(), optional(&target.class_name));
        data.insert("id".to_string(), optional(&target.id));
        let text = target
            .text
            .as_ref()
            .map(|t| t.chars().take(CLICK_TEXT_LIMIT).collect::<String>());
        data.insert("text".to_string(), optional(&text));

        self.add_breadcrumb(
            BreadcrumbInput::new(
                "user_interaction",
                "click",
                format!("Clicked on {}", target.tag_name),
            )
            .with_data(data),
        );
    }

    /// Record a route change, then move the host to `url`.
    pub fn navigate(&self, url: &str) {
        let mut data = Map::new();
        data.insert("url".to_string(), Value::from(url));
        self.add_breadcrumb(
            BreadcrumbInput::new("navigation", "route_change", format!("Navigated to {}", url))
                .with_data(data),
        );
        self.core.host.navigate(url);
    }

    /// Copy of the current breadcrumb buffer.
    pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        self.core.breadcrumbs.snapshot()
    }

    // ========================================================================
    // Capture
    // ========================================================================

    /// Capture an error as `javascript` / `high`. The source chain becomes
    /// the stack.
    pub fn capture_exception(
        &self,
        error: &(dyn std::error::Error + 'static),
        extra: Option<Value>,
    ) {
        let (message, stack) = capture::describe_error(error);
        let mut report = ErrorReport::new(ErrorKind::Javascript, Severity::High, message)
            .with_extra(extra.unwrap_or_else(empty_object));
        if let Some(stack) = stack {
            report = report.with_stack(stack);
        }
        self.core.capture_error(report);
    }

    /// Capture a message as `javascript` at `level`, without a stack.
    pub fn capture_message(&self, message: impl Into<String>, level: Severity, extra: Option<Value>) {
        self.core.capture_error(
            ErrorReport::new(ErrorKind::Javascript, level, message)
                .with_extra(extra.unwrap_or_else(empty_object)),
        );
    }

    /// Capture a report with producer-chosen kind and severity.
    pub fn capture_error(&self, report: ErrorReport) {
        self.core.capture_error(report);
    }

    /// Capture a failure reported by a UI error boundary.
    pub fn capture_render_failure(
        &self,
        error: &(dyn std::error::Error + 'static),
        component_stack: impl Into<String>,
        extra: Option<Value>,
    ) {
        let (message, stack) = capture::describe_error(error);

        let mut extra_data = match extra {
            Some(Value::Object(map)) => map,
            Some(other) => {
                let mut map = Map::new();
                map.insert("extra".to_string(), other);
                map
            }
            None => Map::new(),
        };
        extra_data.insert("errorBoundary".to_string(), Value::Bool(true));

        let mut report = ErrorReport::new(ErrorKind::Render, Severity::Critical, message)
            .with_component_stack(component_stack)
            .with_extra(Value::Object(extra_data));
        if let Some(stack) = stack {
            report = report.with_stack(stack);
        }
        self.core.capture_error(report);
    }

    pub fn track_performance(&self, report: PerformanceReport) {
        self.core.track_performance(report);
    }

    /// Report the host's navigation timing as a `page_load` metric. No-op
    /// when the host has none.
    pub fn track_page_load(&self) {
        let Some(timing) = self.core.host.navigation_timing() else {
            debug!("No navigation timing; skipping page load metric");
            return;
        };

        self.core.track_performance(
            PerformanceReport::new("page_load", timing.load_ms)
                .with_metric("domContentLoaded", timing.dom_content_loaded_ms)
                .with_metric("firstPaint", timing.first_paint_ms)
                .with_metric("firstContentfulPaint", timing.first_contentful_paint_ms),
        );
    }

    // ========================================================================
    // Scope
    // ========================================================================

    /// Attach a user to later errors. A user id replaces the reported user
    /// id for this agent only; the stored id is unchanged.
    pub fn set_user(&self, user: UserContext) {
        if let Some(id) = &user.id {
            self.core
                .identity
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .set_user_id(id.clone());
        }
        self.core.scope.write().unwrap_or_else(PoisonError::into_inner).user = Some(user);
    }

    pub fn set_tag(&self, key: impl Into<String>, value: impl Into<String>) {
        self.core
            .scope
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .tags
            .insert(key.into(), value.into());
    }

    pub fn set_context(&self, key: impl Into<String>, value: Value) {
        self.core
            .scope
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .contexts
            .insert(key.into(), value);
    }

    // ========================================================================
    // Instrumentation and inspection
    // ========================================================================

    /// Wrap `client` so its calls are timed and failures captured. Calls to
    /// the collector pass through untouched.
    pub fn instrument<C: HttpClient>(&self, client: C) -> InstrumentedClient<C> {
        InstrumentedClient::new(
            client,
            Arc::downgrade(&self.core),
            &self.core.config.collector_endpoint(),
        )
    }

    pub fn relay_stats(&self) -> RelayStatsSnapshot {
        self.core.relay.stats()
    }

    /// Owned view for a developer dashboard.
    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            enabled: self.core.enabled,
            environment: self.core.config.environment,
            user_id: self.user_id(),
            session_id: self.session_id(),
            collector_endpoint: self.core.relay.endpoint().to_string(),
            max_breadcrumbs: self.core.breadcrumbs.capacity(),
            breadcrumbs: self.core.breadcrumbs.snapshot(),
            browser_info: BrowserInfo::detect(self.core.host.as_ref()),
            page_load_time: self.core.page_load_time(),
            memory_usage: self.core.memory_usage_mb(),
            session_state: self.session_state(),
            heartbeats_sent: self.core.heartbeats.load(Ordering::Relaxed),
            relay: self.core.relay.stats(),
        }
    }
}

fn optional(value: &Option<String>) -> Value {
    value.clone().map(Value::from).unwrap_or(Value::Null)
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}
