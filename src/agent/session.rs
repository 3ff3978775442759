// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Session start record and liveness heartbeat.

use std::sync::atomic::Ordering;
use std::sync::Weak;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace};

use crate::types::{iso_timestamp, BrowserInfo, Channel, SessionStart, SessionUpdate};

use super::AgentCore;

impl AgentCore {
    pub(crate) fn session_start_record(&self) -> SessionStart {
        let base = self.envelope_base();
        SessionStart {
            session_id: base.session_id,
            user_id: base.user_id,
            user_agent: base.user_agent,
            browser_info: BrowserInfo::detect(self.host.as_ref()),
            start_time: base.timestamp,
            url: base.url,
        }
    }

    pub(crate) fn send_session_start(&self) {
        let record = self.session_start_record();
        debug!(session_id = %record.session_id, "Session started");
        self.relay.send(Channel::Session, &record);
    }

    pub(crate) fn send_session_update(&self) {
        let session_id = self
            .identity
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .session_id()
            .to_string();

        let update = SessionUpdate {
            session_id,
            last_activity: iso_timestamp(),
            current_url: self.host.current_url(),
        };
        self.heartbeats.fetch_add(1, Ordering::Relaxed);
        trace!(session_id = %update.session_id, "Session heartbeat");
        self.relay.send(Channel::SessionUpdate, &update);
    }
}

/// Emit a session update every `period`, first one `period` after start.
///
/// The task holds only a weak reference and stops once the agent is gone.
pub(crate) fn spawn_heartbeat(
    core: Weak<AgentCore>,
    period: Duration,
    runtime: &Handle,
) -> JoinHandle<()> {
    runtime.spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let Some(core) = core.upgrade() else {
                break;
            };
            core.send_session_update();
        }
    })
}
