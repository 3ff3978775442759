// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration loading from files and environment variables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::warn;

use crate::error::ConfigError;

use super::types::AgentConfigFile;

/// Config file names to search for (in order).
pub const CONFIG_FILES: &[&str] = &["pulse.json", ".pulse.json", "pulse.yaml", ".pulse.yaml"];

/// Environment variable names.
pub const ENV_ENVIRONMENT: &str = "PULSE_ENV";
pub const ENV_ENABLED: &str = "PULSE_ENABLE_ERROR_TRACKING";
pub const ENV_API_BASE_URL: &str = "PULSE_API_BASE_URL";
pub const ENV_COLLECTOR_PATH: &str = "PULSE_COLLECTOR_PATH";
pub const ENV_MAX_BREADCRUMBS: &str = "PULSE_MAX_BREADCRUMBS";
pub const ENV_HEARTBEAT_SECS: &str = "PULSE_HEARTBEAT_SECS";
pub const ENV_API_TIMEOUT: &str = "PULSE_API_TIMEOUT";
pub const ENV_STORAGE_DIR: &str = "PULSE_STORAGE_DIR";
pub const ENV_ORIGIN: &str = "PULSE_ORIGIN";

/// Where environment variables are read from.
#[derive(Debug, Clone, Default)]
pub enum EnvSource {
    /// The real process environment.
    #[default]
    Process,
    /// A fixed set of variables.
    Map(HashMap<String, String>),
}

impl EnvSource {
    /// Build a fixed source from key/value pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::Map(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Look up a variable, treating empty values as unset.
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match self {
            Self::Process => std::env::var(key).ok(),
            Self::Map(map) => map.get(key).cloned(),
        };
        value.filter(|v| !v.trim().is_empty())
    }

    fn parse<T: FromStr>(&self, key: &str) -> Option<T> {
        let raw = self.get(key)?;
        match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(var = key, value = %raw, "Ignoring unparseable environment variable");
                None
            }
        }
    }
}

/// Load the configuration layer described by environment variables.
pub fn load_env_config(env: &EnvSource) -> Result<AgentConfigFile, ConfigError> {
    let environment = match env.get(ENV_ENVIRONMENT) {
        Some(raw) => Some(raw.parse()?),
        None => None,
    };

    Ok(AgentConfigFile {
        environment,
        // Only the literal "false" disables tracking
        enabled: env.get(ENV_ENABLED).map(|v| v.trim() != "false"),
        api_base_url: env.get(ENV_API_BASE_URL),
        collector_path: env.get(ENV_COLLECTOR_PATH),
        max_breadcrumbs: env.parse(ENV_MAX_BREADCRUMBS),
        heartbeat_interval_secs: env.parse(ENV_HEARTBEAT_SECS),
        relay_timeout_ms: env.parse(ENV_API_TIMEOUT),
        capture_panics: None,
        storage_dir: env.get(ENV_STORAGE_DIR).map(PathBuf::from),
        origin: env.get(ENV_ORIGIN),
        page_url: None,
    })
}

/// Load workspace configuration from the workspace root.
///
/// Searches for config files in the following order:
/// 1. pulse.json
/// 2. .pulse.json
/// 3. pulse.yaml
/// 4. .pulse.yaml
pub fn load_workspace_config(workspace_root: &Path) -> Result<Option<AgentConfigFile>, ConfigError> {
    for filename in CONFIG_FILES {
        let path = workspace_root.join(filename);
        if path.exists() {
            return load_config_file(&path).map(Some);
        }
    }
    Ok(None)
}

/// Load a configuration file (JSON or YAML).
pub fn load_config_file(path: &Path) -> Result<AgentConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    match extension.to_lowercase().as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&content).map_err(ConfigError::from),
        "json" => serde_json::from_str(&content).map_err(ConfigError::from),
        other => Err(ConfigError::InvalidFormat(format!(
            "unsupported config extension '{}'",
            other
        ))),
    }
}

/// Default directory for the persistent identity store.
pub fn default_storage_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("pulse"))
}
