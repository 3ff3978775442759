// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration merging.
//!
//! Handles merging configurations from different sources with proper precedence.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

use super::types::{AgentConfigFile, Environment, ResolvedConfig};

/// Programmatic overrides applied on top of every other source.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub environment: Option<Environment>,
    pub enabled: Option<bool>,
    pub api_base_url: Option<String>,
    pub max_breadcrumbs: Option<usize>,
    pub heartbeat_interval: Option<Duration>,
    pub relay_timeout: Option<Option<Duration>>,
    pub capture_panics: Option<bool>,
    pub storage_dir: Option<PathBuf>,
    pub page_url: Option<String>,
}

/// Merge configuration layers with precedence.
///
/// Precedence (highest to lowest):
/// 1. Overrides
/// 2. Environment variables
/// 3. Config file
/// 4. Environment defaults
///
/// The environment itself is chosen first, with the same precedence, since
/// it selects the defaults.
pub fn merge_config(
    file: Option<AgentConfigFile>,
    env: AgentConfigFile,
    overrides: ConfigOverrides,
) -> Result<ResolvedConfig, ConfigError> {
    let environment = overrides
        .environment
        .or(env.environment)
        .or_else(|| file.as_ref().and_then(|f| f.environment))
        .unwrap_or_else(Environment::from_build);

    let mut result = ResolvedConfig::for_environment(environment);
    let mut explicit_base_url = false;

    if let Some(config) = &file {
        explicit_base_url |= apply_layer(&mut result, config);
    }
    explicit_base_url |= apply_layer(&mut result, &env);
    explicit_base_url |= apply_overrides(&mut result, &overrides);

    if environment == Environment::Production && !explicit_base_url {
        return Err(ConfigError::MissingField("apiBaseUrl".to_string()));
    }

    result.api_base_url = result.api_base_url.trim_end_matches('/').to_string();
    validate(&result)?;
    Ok(result)
}

/// Apply one partial layer. Returns whether it set the API base URL.
fn apply_layer(result: &mut ResolvedConfig, config: &AgentConfigFile) -> bool {
    if let Some(enabled) = config.enabled {
        result.enabled = enabled;
    }
    if let Some(ref path) = config.collector_path {
        result.collector_path = path.clone();
    }
    if let Some(max) = config.max_breadcrumbs {
        result.max_breadcrumbs = max;
    }
    if let Some(secs) = config.heartbeat_interval_secs {
        result.heartbeat_interval = Duration::from_secs(secs);
    }
    if let Some(ms) = config.relay_timeout_ms {
        result.relay_timeout = (ms > 0).then(|| Duration::from_millis(ms));
    }
    if let Some(capture) = config.capture_panics {
        result.capture_panics = capture;
    }
    if config.storage_dir.is_some() {
        result.storage_dir = config.storage_dir.clone();
    }
    if let Some(ref origin) = config.origin {
        result.origin = origin.clone();
    }
    if let Some(ref url) = config.page_url {
        result.page_url = url.clone();
    }
    match config.api_base_url {
        Some(ref url) => {
            result.api_base_url = url.clone();
            true
        }
        None => false,
    }
}

fn apply_overrides(result: &mut ResolvedConfig, overrides: &ConfigOverrides) -> bool {
    if let Some(enabled) = overrides.enabled {
        result.enabled = enabled;
    }
    if let Some(max) = overrides.max_breadcrumbs {
        result.max_breadcrumbs = max;
    }
    if let Some(interval) = overrides.heartbeat_interval {
        result.heartbeat_interval = interval;
    }
    if let Some(timeout) = overrides.relay_timeout {
        result.relay_timeout = timeout.filter(|t| !t.is_zero());
    }
    if let Some(capture) = overrides.capture_panics {
        result.capture_panics = capture;
    }
    if overrides.storage_dir.is_some() {
        result.storage_dir = overrides.storage_dir.clone();
    }
    if let Some(ref url) = overrides.page_url {
        result.page_url = url.clone();
    }
    match overrides.api_base_url {
        Some(ref url) => {
            result.api_base_url = url.clone();
            true
        }
        None => false,
    }
}

/// Reject settings the agent cannot run with.
pub fn validate(config: &ResolvedConfig) -> Result<(), ConfigError> {
    if config.heartbeat_interval.is_zero() {
        return Err(ConfigError::invalid(
            "heartbeatIntervalSecs",
            "must be greater than zero",
        ));
    }
    if config.api_base_url.is_empty() {
        return Err(ConfigError::invalid("apiBaseUrl", "must not be empty"));
    }
    if config.collector_path.trim_matches('/').is_empty() {
        return Err(ConfigError::invalid("collectorPath", "must not be empty"));
    }
    Ok(())
}
