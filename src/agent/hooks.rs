// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Global failure hooks.
//!
//! Uncaught failures reach the capture pipeline two ways: the process panic
//! hook, and fallible tasks spawned through [`TelemetryAgent::spawn_tracked`]
//! whose error nobody else observes. Both report `javascript` / `high`.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use std::future::Future;
use std::panic::{self, PanicHookInfo};
use std::sync::{Arc, Weak};

use tokio::task::JoinHandle;
use tracing::debug;

use crate::types::{ErrorKind, Severity};

use super::{AgentCore, ErrorReport, TelemetryAgent};

/// Chain a capturing hook in front of the current panic hook.
///
/// The previous hook always runs afterwards. Installing twice reports every
/// panic twice.
pub(crate) fn install_panic_hook(core: Weak<AgentCore>) {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        if let Some(core) = core.upgrade() {
            core.capture_error(panic_report(info));
        }
        previous(info);
    }));
    debug!("Panic hook installed");
}

/// Error report for a panic: payload message, source location, and a
/// backtrace when `RUST_BACKTRACE` enables one.
pub(crate) fn panic_report(info: &PanicHookInfo<'_>) -> ErrorReport {
    let payload = info.payload();
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    };

    let mut report = ErrorReport::new(ErrorKind::Javascript, Severity::High, message);
    if let Some(location) = info.location() {
        report = report.with_location(location.file(), location.line(), location.column());
    }

    let backtrace = Backtrace::capture();
    if backtrace.status() == BacktraceStatus::Captured {
        report = report.with_stack(backtrace.to_string());
    }
    report
}

impl AgentCore {
    pub(crate) fn capture_rejection(&self, reason: &dyn fmt::Display) {
        self.capture_error(ErrorReport::new(
            ErrorKind::Javascript,
            Severity::High,
            format!("Unhandled rejection: {}", reason),
        ));
    }
}

impl TelemetryAgent {
    /// Install the panic hook. [`start`](Self::start) already does this when
    /// `capture_panics` is set.
    pub fn install_panic_hook(&self) {
        if !self.core.enabled {
            return;
        }
        install_panic_hook(Arc::downgrade(&self.core));
    }

    /// Run a fallible future on the agent's runtime.
    ///
    /// An `Err` is captured as an unhandled rejection and the handle
    /// resolves to `None`; an `Ok` value is passed through.
    pub fn spawn_tracked<F, T, E>(&self, future: F) -> JoinHandle<Option<T>>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let core = Arc::downgrade(&self.core);
        self.core.runtime.spawn(async move {
            match future.await {
                Ok(value) => Some(value),
                Err(reason) => {
                    if let Some(core) = core.upgrade() {
                        core.capture_rejection(&reason);
                    }
                    None
                }
            }
        })
    }
}
