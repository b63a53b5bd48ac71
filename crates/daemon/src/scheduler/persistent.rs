// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent mode: one long-lived backend session kept alive by pulses.
//!
//! With no session the agent is started with full context. Afterwards a
//! heartbeat pulse resumes the session every heartbeat interval, upgraded
//! to a checkpoint pulse (summary saved to memory) once the checkpoint
//! interval has also passed. A session that outlives its maximum duration
//! is stopped; a failed pulse ends the session and the restart policy
//! decides what happens next.

use std::time::Duration;

use cx_adapters::{ExecutionBackend, NotifyAdapter, WatchScriptRunner};
use cx_core::{
    AgentDefinition, AgentStatus, Clock, DaemonAgentState, EntryKind, MemoryEntry,
    NotificationEvent,
};
use tracing::{debug, info, warn};

use super::outcome::{after, elapsed};
use super::{HandlerError, Scheduler};
use crate::dispatch::failure_message;
use crate::memory::load_context;

pub(crate) const SESSION_START_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub(crate) const PULSE_TIMEOUT: Duration = Duration::from_secs(120);
/// Budget for the initial invocation when the agent sets no limit
pub(crate) const DEFAULT_SESSION_BUDGET_USD: f64 = 1.0;

pub(crate) const HEARTBEAT_PROMPT: &str =
    "Continue your ongoing task. Report your current status and any progress.";
pub(crate) const CHECKPOINT_PROMPT: &str = "Checkpoint: Summarize your current state, progress, \
and any pending tasks. This will be saved to memory for continuity.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pulse {
    Heartbeat,
    Checkpoint,
}

impl Pulse {
    fn prompt(self) -> &'static str {
        match self {
            Pulse::Heartbeat => HEARTBEAT_PROMPT,
            Pulse::Checkpoint => CHECKPOINT_PROMPT,
        }
    }

    fn budget_usd(self) -> f64 {
        match self {
            Pulse::Heartbeat => 0.05,
            Pulse::Checkpoint => 0.10,
        }
    }
}

impl<B, S, N, C> Scheduler<B, S, N, C>
where
    B: ExecutionBackend,
    S: WatchScriptRunner,
    N: NotifyAdapter,
    C: Clock,
{
    pub(crate) async fn handle_persistent(&self, def: &AgentDefinition) -> Result<(), HandlerError> {
        let Some(agent) = self.state.agent(&def.name) else {
            return Ok(());
        };
        let now = self.clock.now();
        // Failed sessions wait for an explicit start or resume
        if agent.status == AgentStatus::Failed || agent.in_cooldown(now) {
            return Ok(());
        }

        let Some(session) = agent.session_id.clone() else {
            return self.start_session(def).await;
        };

        let config = def.persistent();
        if let Some(max) = config.max_session_duration() {
            let started = agent.session_started_at.or(agent.last_run);
            if started.is_some_and(|at| elapsed(at, now, max)) {
                info!(agent = %def.name, "session expired");
                self.state.update_agent(&def.name, DaemonAgentState::clear_session);
                self.persist_status(def, AgentStatus::Stopped);
                return Ok(());
            }
        }

        if agent.last_run.is_some_and(|last| !elapsed(last, now, config.heartbeat_interval())) {
            return Ok(());
        }
        let pulse = if agent.last_check.is_some_and(|c| !elapsed(c, now, config.checkpoint_interval())) {
            Pulse::Heartbeat
        } else {
            Pulse::Checkpoint
        };
        self.pulse(def, session, pulse).await;
        Ok(())
    }

    async fn start_session(&self, def: &AgentDefinition) -> Result<(), HandlerError> {
        let Some(_running) = self.state.try_begin_run(&def.name) else {
            return Ok(());
        };

        info!(agent = %def.name, "starting persistent session");
        let prompt = load_context(&self.vault, def, None)?;
        let mut request = self.invoke_request(def, prompt, SESSION_START_TIMEOUT);
        request.max_budget_usd = Some(def.max_budget_usd().unwrap_or(DEFAULT_SESSION_BUDGET_USD));
        let result = self.backend.invoke(request).await;
        if self.shutting_down() {
            info!(agent = %def.name, "session start interrupted by shutdown");
            return Ok(());
        }

        let at = self.clock.now();
        self.vault.log_run(def, &result, at);
        self.vault.record_cost(def, &result, at);
        self.dispatcher.check_budget(def, &result).await;

        match result.session_id.clone().filter(|_| !result.is_error) {
            Some(session) => {
                self.state.update_agent(&def.name, |a| {
                    a.session_id = Some(session);
                    a.session_started_at = Some(at);
                    a.last_run = Some(at);
                    a.last_check = Some(at);
                    a.consecutive_failures = 0;
                });
                info!(agent = %def.name, "persistent session established");
            }
            None => {
                let failures = self.state.update_agent(&def.name, |a| a.record_failure());
                warn!(agent = %def.name, ?failures, "persistent session failed to start");
                self.dispatcher.dispatch(def, NotificationEvent::Failure, failure_message(&result)).await;
            }
        }
        Ok(())
    }

    async fn pulse(&self, def: &AgentDefinition, session: String, pulse: Pulse) {
        let Some(_running) = self.state.try_begin_run(&def.name) else {
            return;
        };

        debug!(agent = %def.name, ?pulse, "pulse");
        let mut request = self.invoke_request(def, pulse.prompt().to_string(), PULSE_TIMEOUT);
        request.resume_session = Some(session.clone());
        request.max_budget_usd = Some(pulse.budget_usd());
        let result = self.backend.invoke(request).await;
        if self.shutting_down() {
            info!(agent = %def.name, ?pulse, "pulse interrupted by shutdown, keeping session");
            return;
        }

        let at = self.clock.now();
        self.vault.record_cost(def, &result, at);
        self.dispatcher.check_budget(def, &result).await;

        if result.is_error {
            self.end_session(def);
            self.dispatcher.dispatch(def, NotificationEvent::Failure, failure_message(&result)).await;
            return;
        }

        if pulse == Pulse::Checkpoint && def.memory_enabled() {
            let entry = MemoryEntry::new(EntryKind::Checkpoint, &result.result, at);
            if let Err(e) = self.vault.memory.append(&def.name, entry) {
                warn!(agent = %def.name, error = %e, "failed to save checkpoint");
            }
        }

        self.state.update_agent(&def.name, |a| {
            a.session_id = Some(result.session_id.clone().unwrap_or(session));
            a.last_run = Some(at);
            a.consecutive_failures = 0;
            if pulse == Pulse::Checkpoint {
                a.last_check = Some(at);
            }
        });
    }

    /// A pulse failed: restart after the delay or park the agent.
    fn end_session(&self, def: &AgentDefinition) {
        let config = def.persistent();
        let policy = config.restart_policy();
        let now = self.clock.now();
        let Some(failures) = self.state.update_agent(&def.name, |a| {
            a.clear_session();
            a.record_failure()
        }) else {
            return;
        };

        if policy.should_restart(true) {
            let until = after(now, config.restart_delay());
            self.state.update_agent(&def.name, |a| a.cooldown_until = Some(until));
            info!(agent = %def.name, %policy, failures, restart_at = %until, "session ended, restarting");
        } else {
            warn!(agent = %def.name, %policy, failures, "session ended, marking failed");
            self.persist_status(def, AgentStatus::Failed);
        }
    }
}

#[cfg(test)]
#[path = "persistent_tests.rs"]
mod tests;
