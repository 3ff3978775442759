// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration module for Pulse.
//!
//! Handles loading, merging, and validation of configuration from multiple sources:
//! - Environment defaults: selected by `PULSE_ENV` or the build profile
//! - Workspace config: pulse.json, .pulse.json, pulse.yaml, or .pulse.yaml
//! - Environment variables: `PULSE_*`
//! - Overrides: set programmatically by the embedding application
//!
//! Configuration is merged with precedence (overrides > env vars > file > defaults).

mod loader;
mod merger;
mod types;

pub use loader::{
    default_storage_dir, load_config_file, load_env_config, load_workspace_config,
    EnvSource, CONFIG_FILES, ENV_API_BASE_URL, ENV_API_TIMEOUT,
    ENV_COLLECTOR_PATH, ENV_ENABLED, ENV_ENVIRONMENT, ENV_HEARTBEAT_SECS, ENV_MAX_BREADCRUMBS,
    ENV_ORIGIN, ENV_STORAGE_DIR,
};

pub use merger::{merge_config, validate, ConfigOverrides};

pub use types::{
    AgentConfigFile, Environment, ResolvedConfig, DEFAULT_COLLECTOR_PATH,
    DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_MAX_BREADCRUMBS,
};

use crate::error::ConfigError;
use std::path::Path;

/// Load and merge all configuration sources for a workspace.
///
/// This is the main entry point for configuration loading.
pub fn load_config(
    workspace_root: &Path,
    env: &EnvSource,
    overrides: ConfigOverrides,
) -> Result<ResolvedConfig, ConfigError> {
    let file = load_workspace_config(workspace_root)?;
    let env = load_env_config(env)?;

    merge_config(file, env, overrides)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_with_no_files() {
        let temp = TempDir::new().unwrap();
        let env = EnvSource::from_pairs([(ENV_ENVIRONMENT, "test")]);
        let config = load_config(temp.path(), &env, ConfigOverrides::default()).unwrap();

        assert_eq!(config.environment, Environment::Test);
        assert_eq!(
            config.collector_endpoint(),
            "http://localhost:8000/api/v1/error-tracking"
        );
    }

    #[test]
    fn test_load_config_with_workspace_config() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("pulse.json"),
            r#"{"environment": "production", "apiBaseUrl": "https://api.example.org/v1"}"#,
        )
        .unwrap();

        let env = EnvSource::Map(Default::default());
        let config = load_config(temp.path(), &env, ConfigOverrides::default()).unwrap();
        assert!(config.is_production());
        assert_eq!(config.collector_endpoint(), "https://api.example.org/v1/error-tracking");
    }

    #[test]
    fn test_load_config_env_disables() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("pulse.json"), r#"{"enabled": true}"#).unwrap();

        let env = EnvSource::from_pairs([(ENV_ENVIRONMENT, "test"), (ENV_ENABLED, "false")]);
        let config = load_config(temp.path(), &env, ConfigOverrides::default()).unwrap();
        assert!(!config.enabled); // env beats file
    }
}
