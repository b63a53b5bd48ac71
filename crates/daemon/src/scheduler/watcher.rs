// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watcher mode: poll a script, run the agent when it reports a trigger.

use std::time::Duration;

use chrono::{DateTime, Utc};
use cx_adapters::script::SCRIPT_TIMEOUT;
use cx_adapters::{ExecutionBackend, NotifyAdapter, ScriptOutcome, ScriptRequest, WatchScriptRunner};
use cx_core::{
    memory::timestamp, trigger, truncate_chars, AgentDefinition, AgentStatus, Clock,
    DaemonAgentState, DefinitionError, NotificationEvent, RunResult,
};
use serde_json::{json, Value as Json};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::outcome::{after, elapsed};
use super::{HandlerError, Scheduler};
use crate::memory::load_context;

pub(crate) const WATCHER_RUN_TIMEOUT: Duration = Duration::from_secs(10 * 60);
/// Consecutive script errors before the agent is paused
pub(crate) const AUTO_PAUSE_FAILURES: u32 = 3;

const TRIGGERED_PREFIX: &str = "**Triggered by watcher**";

impl<B, S, N, C> Scheduler<B, S, N, C>
where
    B: ExecutionBackend,
    S: WatchScriptRunner,
    N: NotifyAdapter,
    C: Clock,
{
    pub(crate) async fn handle_watcher(&self, def: &AgentDefinition) -> Result<(), HandlerError> {
        let name = def.name.as_str();
        let watcher = def
            .execution
            .watcher
            .as_ref()
            .ok_or_else(|| DefinitionError::MissingWatcher(def.name.clone()))?;

        let now = self.clock.now();
        let poll = watcher.poll_interval();
        let gate = self.state.update_agent(name, |a| {
            if a.last_check.is_some_and(|last| !elapsed(last, now, poll)) {
                return None;
            }
            let previous = a.last_check.replace(now);
            if a.in_cooldown(now) {
                return None;
            }
            Some(previous)
        });
        let Some(previous_check) = gate.flatten() else {
            return Ok(());
        };

        let Some(_running) = self.state.try_begin_run(name) else {
            return Ok(());
        };

        let request = ScriptRequest {
            agent: def.name.clone(),
            script: self.vault.paths.watchers_dir().join(&watcher.script),
            last_check: previous_check.map(timestamp),
            env: self.vault.secrets(def),
            timeout: SCRIPT_TIMEOUT,
        };
        let (triggered, context) = match self.scripts.run(request).await {
            ScriptOutcome::Cancelled => {
                debug!(agent = name, "watch script stopped by shutdown");
                return Ok(());
            }
            ScriptOutcome::Error(error) => {
                self.watcher_script_failed(def, &error).await;
                return Ok(());
            }
            ScriptOutcome::Checked { triggered, context } => (triggered, context),
        };
        self.state.update_agent(name, DaemonAgentState::reset_failures);

        if !triggered {
            debug!(agent = name, "watcher not triggered");
            return Ok(());
        }
        // A condition filters the returned context; with no context it has
        // nothing to judge and the trigger stands.
        if let (Some(condition), Some(ctx)) = (watcher.trigger_condition.as_deref(), &context) {
            if !trigger::evaluate(condition, ctx) {
                debug!(agent = name, condition, "trigger condition not met");
                return Ok(());
            }
        }

        if let Some(cooldown) = watcher.cooldown() {
            self.state.update_agent(name, |a| a.cooldown_until = Some(after(now, cooldown)));
        }
        info!(agent = name, "watcher triggered");
        let summary = context.clone().unwrap_or_else(|| json!({})).to_string();
        self.dispatcher
            .dispatch(
                def,
                NotificationEvent::Trigger,
                format!("Watcher triggered: {}", truncate_chars(&summary, 200)),
            )
            .await;

        let watcher_context = match (&context, watcher.pass_context()) {
            (Some(ctx), true) => Some(pretty(ctx)),
            _ => None,
        };
        let prompt = load_context(&self.vault, def, watcher_context.as_deref())?;
        let request = self.invoke_request(def, prompt, WATCHER_RUN_TIMEOUT);
        let result = self.backend.invoke(request).await;
        if self.shutting_down() {
            info!(agent = name, "watcher run interrupted by shutdown");
            return Ok(());
        }

        self.record_run(def, &result, Some(TRIGGERED_PREFIX)).await;
        self.finish_watcher_run(def, &result, self.clock.now()).await;
        Ok(())
    }

    async fn watcher_script_failed(&self, def: &AgentDefinition, error: &str) {
        let Some(failures) = self.state.update_agent(&def.name, |a| a.record_script_failure())
        else {
            return;
        };
        warn!(agent = %def.name, failures, error, "watch script failed");
        if failures < AUTO_PAUSE_FAILURES {
            return;
        }

        self.persist_status(def, AgentStatus::Paused);
        warn!(agent = %def.name, failures, "watcher auto-paused");
        let message =
            format!("Auto-paused after {failures} consecutive watcher failures: {error}");
        self.dispatcher.dispatch(def, NotificationEvent::Failure, message).await;
    }

    /// Update state after a run and notify unless the result repeats the last one.
    async fn finish_watcher_run(&self, def: &AgentDefinition, result: &RunResult, at: DateTime<Utc>) {
        let hash = result_hash(&result.result);
        let duplicate = self.state.update_agent(&def.name, |a| {
            let duplicate = a.last_result_hash.as_deref() == Some(hash.as_str());
            a.last_result_hash = Some(hash);
            if result.is_error {
                a.record_failure();
            } else {
                a.consecutive_failures = 0;
                a.last_run = Some(at);
            }
            duplicate
        });
        let duplicate = duplicate.unwrap_or(false);

        if result.is_error {
            let message = format!("Watcher run failed: {}", truncate_chars(&result.result, 200));
            self.dispatcher.dispatch(def, NotificationEvent::Failure, message).await;
        } else if duplicate {
            debug!(agent = %def.name, "result unchanged, skipping notification");
        } else {
            let message = format!(
                "Watcher run completed (${:.4})\n\n{}",
                result.cost_usd,
                truncate_chars(&result.result, 3000)
            );
            self.dispatcher.dispatch(def, NotificationEvent::Completion, message).await;
        }
    }
}

/// Hex SHA-256 of a result text
pub(crate) fn result_hash(text: &str) -> String {
    Sha256::digest(text.as_bytes()).iter().map(|b| format!("{b:02x}")).collect()
}

fn pretty(ctx: &Json) -> String {
    serde_json::to_string_pretty(ctx).unwrap_or_else(|_| ctx.to_string())
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
