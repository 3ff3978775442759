// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Diagnostic logging setup for applications embedding the agent.
//!
//! The agent only emits `tracing` events; nothing is printed unless the host
//! installs a subscriber, for example with [`init_logging`]. Captured
//! envelopes and dropped sends log at `debug`, so they show up in development
//! and stay silent in production.

use std::io;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::Environment;

/// Output layout of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One short line per event.
    Compact,
    /// Multi-field layout with span context.
    Full,
}

/// Subscriber settings.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level used when neither `directive` nor `RUST_LOG` is set.
    pub level: Level,
    /// Explicit filter directive. Takes precedence over `RUST_LOG`.
    pub directive: Option<String>,
    pub format: LogFormat,
    pub ansi: bool,
    /// Include file and line of each event.
    pub source_location: bool,
    /// Log span enter/close.
    pub span_events: bool,
}

impl LoggingConfig {
    /// Preset for a deployment environment.
    pub fn for_environment(environment: Environment) -> Self {
        match environment {
            Environment::Development => Self {
                level: Level::DEBUG,
                directive: None,
                format: LogFormat::Full,
                ansi: true,
                source_location: true,
                span_events: false,
            },
            Environment::Production => Self {
                level: Level::WARN,
                directive: None,
                format: LogFormat::Compact,
                ansi: false,
                source_location: false,
                span_events: false,
            },
            Environment::Test => Self {
                level: Level::TRACE,
                directive: Some("pulse=trace".to_string()),
                format: LogFormat::Full,
                ansi: false,
                source_location: true,
                span_events: true,
            },
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directive = Some(directive.into());
        self
    }

    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    fn filter(&self) -> EnvFilter {
        let by_level = || EnvFilter::new(self.level.to_string());
        match &self.directive {
            Some(directive) => EnvFilter::try_new(directive).unwrap_or_else(|_| by_level()),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| by_level()),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::for_environment(Environment::from_build())
    }
}

/// Returned by [`init_logging`]. Keep it alive for the life of the program.
pub struct LoggingGuard {
    _private: (),
}

/// Install a global `tracing` subscriber. Fails if one is already set.
///
/// ```rust,ignore
/// use pulse::logging::{init_logging, LoggingConfig};
///
/// let _guard = init_logging(&LoggingConfig::for_environment(config.environment))?;
/// ```
pub fn init_logging(config: &LoggingConfig) -> io::Result<LoggingGuard> {
    let layer = fmt::layer()
        .with_ansi(config.ansi)
        .with_file(config.source_location)
        .with_line_number(config.source_location)
        .with_span_events(if config.span_events {
            FmtSpan::ENTER | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        });

    let registry = tracing_subscriber::registry().with(config.filter());
    let installed = match config.format {
        LogFormat::Compact => registry.with(layer.compact()).try_init(),
        LogFormat::Full => registry.with(layer).try_init(),
    };
    installed.map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    Ok(LoggingGuard { _private: () })
}
