// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon runtime state, one entry per known agent.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::{AgentDefinition, AgentMode, AgentStatus};

/// Runtime state the scheduler keeps for one agent name.
///
/// `running` is true only while an invocation for this agent is in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonAgentState {
    pub name: String,
    /// Unknown until the definition has been observed
    #[serde(default)]
    pub mode: Option<AgentMode>,
    #[serde(default)]
    pub status: AgentStatus,
    #[serde(default)]
    pub running: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_check: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run: Option<DateTime<Utc>>,
    #[serde(default)]
    pub consecutive_failures: u32,
    /// Watch-script errors in a row; only these can auto-pause a watcher
    #[serde(default)]
    pub script_failures: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_until: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_result_hash: Option<String>,
    /// Status set over IPC; wins over the definition until the definition changes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_override: Option<AgentStatus>,
    /// Definition status seen on the last refresh
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_status: Option<AgentStatus>,
}

impl DaemonAgentState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: None,
            status: AgentStatus::Active,
            running: false,
            session_id: None,
            session_started_at: None,
            last_run: None,
            last_check: None,
            next_run: None,
            consecutive_failures: 0,
            script_failures: 0,
            cooldown_until: None,
            last_result_hash: None,
            status_override: None,
            observed_status: None,
        }
    }

    /// Mirror mode and status from the definition.
    ///
    /// An IPC override survives refreshes until the definition's own status
    /// changes, at which point the definition wins again.
    pub fn refresh(&mut self, def: &AgentDefinition) {
        self.mode = Some(def.mode());
        if self.observed_status != Some(def.status) {
            self.observed_status = Some(def.status);
            self.status_override = None;
        }
        self.status = self.status_override.unwrap_or(def.status);
    }

    /// Apply a status requested over IPC.
    pub fn override_status(&mut self, status: AgentStatus) {
        self.status_override = Some(status);
        self.status = status;
    }

    /// Record a status the daemon itself persisted to the definition.
    pub fn set_definition_status(&mut self, status: AgentStatus) {
        self.observed_status = Some(status);
        self.status_override = None;
        self.status = status;
    }

    pub fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        self.cooldown_until.is_some_and(|until| until > now)
    }

    pub fn record_failure(&mut self) -> u32 {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_failures
    }

    /// Count a watch-script error toward both the overall and the script
    /// streak. Returns the script streak.
    pub fn record_script_failure(&mut self) -> u32 {
        self.record_failure();
        self.script_failures = self.script_failures.saturating_add(1);
        self.script_failures
    }

    pub fn reset_failures(&mut self) {
        self.consecutive_failures = 0;
        self.script_failures = 0;
    }

    pub fn clear_session(&mut self) {
        self.session_id = None;
        self.session_started_at = None;
    }
}

/// Whole-daemon state, persisted after every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonState {
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub agents: BTreeMap<String, DaemonAgentState>,
}

impl DaemonState {
    pub fn new(pid: u32, started_at: DateTime<Utc>) -> Self {
        Self { pid, started_at, agents: BTreeMap::new() }
    }

    /// Adopt a snapshot written by a previous daemon process.
    ///
    /// Children of that process are not tracked by this one, so no agent can
    /// still be running from our point of view.
    pub fn recover(mut self, pid: u32, started_at: DateTime<Utc>) -> Self {
        self.pid = pid;
        self.started_at = started_at;
        for agent in self.agents.values_mut() {
            agent.running = false;
        }
        self
    }

    pub fn agent(&self, name: &str) -> Option<&DaemonAgentState> {
        self.agents.get(name)
    }

    pub fn agent_mut(&mut self, name: &str) -> Option<&mut DaemonAgentState> {
        self.agents.get_mut(name)
    }

    /// Get the entry for `name`, creating a default one if absent.
    pub fn ensure_agent(&mut self, name: &str) -> &mut DaemonAgentState {
        self.agents
            .entry(name.to_string())
            .or_insert_with(|| DaemonAgentState::new(name))
    }

    pub fn remove_agent(&mut self, name: &str) -> Option<DaemonAgentState> {
        self.agents.remove(name)
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
