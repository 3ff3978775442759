// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Agent state and dashboard types.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::Environment;
use crate::transport::RelayStatsSnapshot;
use crate::types::{Breadcrumb, BrowserInfo, UserContext};

/// Lifecycle of the agent's session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Built but not started.
    #[default]
    Idle,
    /// Start record sent; heartbeat running.
    Started,
}

/// Scope data attached to every subsequent error envelope.
#[derive(Debug, Clone, Default)]
pub(crate) struct Scope {
    pub tags: BTreeMap<String, String>,
    pub contexts: BTreeMap<String, Value>,
    pub user: Option<UserContext>,
}

/// Owned view of the agent for a developer dashboard.
///
/// Every field is a copy; holding a snapshot never pins or mutates live
/// agent state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSnapshot {
    pub enabled: bool,
    pub environment: Environment,
    pub user_id: String,
    pub session_id: String,
    pub collector_endpoint: String,
    pub max_breadcrumbs: usize,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub browser_info: BrowserInfo,
    /// Page load duration in milliseconds.
    pub page_load_time: Option<u64>,
    /// Memory estimate in megabytes.
    pub memory_usage: Option<u64>,
    pub session_state: SessionState,
    /// Session updates emitted so far.
    pub heartbeats_sent: u64,
    pub relay: RelayStatsSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_state_default() {
        assert_eq!(SessionState::default(), SessionState::Idle);
        assert_eq!(serde_json::to_value(SessionState::Started).unwrap(), "started");
    }

    #[test]
    fn test_scope_default_is_empty() {
        let scope = Scope::default();
        assert!(scope.tags.is_empty());
        assert!(scope.contexts.is_empty());
        assert!(scope.user.is_none());
    }
}
