// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! User and session identity.
//!
//! The user id is durable: it is read from a [`KeyValueStore`] and written
//! there on first use, so every agent sharing that store reports the same
//! user. The session id is ephemeral: a new one is minted for every agent.
//!
//! Resolution never fails. If the store cannot be read or written, the agent
//! keeps an in-memory user id for its own lifetime and logs a warning. A
//! [`FileStore`] whose file cannot be parsed reads as empty, so the fresh id
//! overwrites it and later loads see that id.

mod storage;

pub use storage::{FileStore, KeyValueStore, MemoryStore};

use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

/// Storage key holding the durable user id.
pub const USER_ID_KEY: &str = "error_tracker_user_id";

/// Resolved identity of one agent instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    user_id: String,
    session_id: String,
}

impl Identity {
    /// Resolve the durable user id from `store` and mint a fresh session id.
    pub fn resolve(store: &dyn KeyValueStore) -> Self {
        Self {
            user_id: resolve_user_id(store),
            session_id: generate_id("session"),
        }
    }

    /// Identity with explicit ids.
    pub fn new(user_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Replace the user id for the rest of this session. Not persisted.
    pub fn set_user_id(&mut self, user_id: impl Into<String>) {
        self.user_id = user_id.into();
    }
}

fn resolve_user_id(store: &dyn KeyValueStore) -> String {
    match store.get(USER_ID_KEY) {
        Ok(Some(existing)) if !existing.trim().is_empty() => existing,
        Ok(_) => {
            let user_id = generate_id("user");
            if let Err(e) = store.set(USER_ID_KEY, &user_id) {
                warn!(error = %e, "Could not persist user id; using in-memory id");
            }
            user_id
        }
        Err(e) => {
            warn!(error = %e, "Identity storage unavailable; using in-memory id");
            generate_id("user")
        }
    }
}

/// `<prefix>_<unix millis>_<9 random chars>`.
pub fn generate_id(prefix: &str) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}", prefix, Utc::now().timestamp_millis(), &random[..9])
}
