// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration type definitions.
//!
//! Defines the partial configuration read from files and environment
//! variables, and the fully resolved configuration the agent runs with.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Deployment environment. Selects the defaults applied before any
/// explicit configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    /// Environment implied by the build profile.
    pub fn from_build() -> Self {
        if cfg!(debug_assertions) {
            Self::Development
        } else {
            Self::Production
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }

    /// Collector base URL used when none is configured.
    pub fn default_api_base_url(&self) -> &'static str {
        match self {
            Self::Production => "https://api.example.com/api/v1",
            Self::Development | Self::Test => "http://localhost:8000/api/v1",
        }
    }

    /// Relay timeout used when none is configured.
    pub fn default_relay_timeout(&self) -> Duration {
        match self {
            Self::Development => Duration::from_millis(15_000),
            Self::Production => Duration::from_millis(10_000),
            Self::Test => Duration::from_millis(5_000),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::invalid(
                "environment",
                format!("unknown environment '{}'", other),
            )),
        }
    }
}

/// Partial agent configuration.
///
/// Read from `pulse.json` / `pulse.yaml` in the workspace root, and also
/// produced from environment variables. Unset fields defer to lower layers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfigFile {
    /// Deployment environment (development, production, test)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,

    /// Master switch for all capture and relay
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// API base URL the collector lives under
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,

    /// Collector path segment under the API base
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collector_path: Option<String>,

    /// Breadcrumb ring buffer capacity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_breadcrumbs: Option<usize>,

    /// Seconds between session heartbeats
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heartbeat_interval_secs: Option<u64>,

    /// Relay call timeout in milliseconds (0 disables)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relay_timeout_ms: Option<u64>,

    /// Install the panic hook on start
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_panics: Option<bool>,

    /// Directory for the persistent identity store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,

    /// Storage scope for the durable user id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    /// Initial address reported by the process host
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
}

/// Fully resolved configuration with all defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub environment: Environment,
    pub enabled: bool,
    pub api_base_url: String,
    pub collector_path: String,
    pub max_breadcrumbs: usize,
    pub heartbeat_interval: Duration,
    pub relay_timeout: Option<Duration>,
    pub capture_panics: bool,
    pub storage_dir: Option<PathBuf>,
    pub origin: String,
    pub page_url: String,
}

/// Default breadcrumb capacity.
pub const DEFAULT_MAX_BREADCRUMBS: usize = 50;

/// Default heartbeat period.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Default collector path segment.
pub const DEFAULT_COLLECTOR_PATH: &str = "error-tracking";

impl ResolvedConfig {
    /// Defaults for the given environment.
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            environment,
            enabled: true,
            api_base_url: environment.default_api_base_url().to_string(),
            collector_path: DEFAULT_COLLECTOR_PATH.to_string(),
            max_breadcrumbs: DEFAULT_MAX_BREADCRUMBS,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            relay_timeout: Some(environment.default_relay_timeout()),
            capture_panics: true,
            storage_dir: None,
            origin: "default".to_string(),
            page_url: "app://localhost/".to_string(),
        }
    }

    /// Collector endpoint, `<api_base_url>/<collector_path>`, without a
    /// trailing slash.
    pub fn collector_endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            self.collector_path.trim_matches('/')
        )
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self::for_environment(Environment::from_build())
    }
}
