// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! What every mode does around an invocation: build the request, then
//! feed the result to the run log, ledger, memory and compactor.

use std::time::Duration;

use chrono::{DateTime, Utc};
use cx_adapters::{ExecutionBackend, InvokeRequest, NotifyAdapter, WatchScriptRunner};
use cx_core::{
    truncate_chars, AgentDefinition, AgentStatus, Clock, EntryKind, MemoryEntry, RunResult,
};
use tracing::warn;

use super::Scheduler;

/// Characters of result text kept in a `run_result` memory entry
pub(crate) const MEMORY_RESULT_CHARS: usize = 2000;

impl<B, S, N, C> Scheduler<B, S, N, C>
where
    B: ExecutionBackend,
    S: WatchScriptRunner,
    N: NotifyAdapter,
    C: Clock,
{
    /// Request with the agent's model, tools, budget and secrets.
    pub(crate) fn invoke_request(
        &self,
        def: &AgentDefinition,
        prompt: String,
        timeout: Duration,
    ) -> InvokeRequest {
        let mut request = InvokeRequest::new(&def.name, prompt, timeout);
        request.model = Some(def.model.clone().unwrap_or_else(|| self.config.default_model.clone()));
        request.tools = def.tools.clone();
        request.max_budget_usd = def.max_budget_usd();
        request.env = self.vault.secrets(def);
        request
    }

    /// Run log, cost, memory entry, compaction and budget check.
    ///
    /// Every step is best effort: failures are logged and the rest still run.
    pub(crate) async fn record_run(
        &self,
        def: &AgentDefinition,
        result: &RunResult,
        memory_prefix: Option<&str>,
    ) {
        let at = self.clock.now();
        self.vault.log_run(def, result, at);
        self.vault.record_cost(def, result, at);

        if def.memory_enabled() {
            let entry = MemoryEntry::new(EntryKind::RunResult, run_summary(result, memory_prefix), at);
            if let Err(e) = self.vault.memory.append(&def.name, entry) {
                warn!(agent = %def.name, error = %e, "failed to append memory");
            }
            if let Err(e) = self.compactor.compact_if_needed(def).await {
                warn!(agent = %def.name, error = %e, "compaction failed");
            }
        }

        self.dispatcher.check_budget(def, result).await;
    }

    /// Write `status` to the definition and mirror it in state.
    ///
    /// If the definition cannot be written the status is held as an
    /// override so the next refresh does not undo it.
    pub(crate) fn persist_status(&self, def: &AgentDefinition, status: AgentStatus) {
        match self.vault.definitions.set_status(&def.name, status) {
            Ok(()) => {
                self.state.update_agent(&def.name, |a| a.set_definition_status(status));
            }
            Err(e) => {
                warn!(agent = %def.name, %status, error = %e, "failed to persist status");
                self.state.update_agent(&def.name, |a| a.override_status(status));
            }
        }
    }

    /// Shutdown has begun draining children. A run that ends now was cut
    /// short by the daemon, so it is neither a failure nor a status change.
    pub(crate) fn shutting_down(&self) -> bool {
        self.registry.is_draining()
    }
}

/// Memory entry body for one run.
pub(crate) fn run_summary(result: &RunResult, prefix: Option<&str>) -> String {
    let mut text = String::new();
    if let Some(prefix) = prefix {
        text.push_str(prefix);
        text.push('\n');
    }
    text.push_str(&format!(
        "**Status**: {}\n**Cost**: ${:.4}\n\n{}",
        result.status_label(),
        result.cost_usd,
        truncate_chars(&result.result, MEMORY_RESULT_CHARS)
    ));
    text
}

/// At least `interval` has passed between `since` and `now`.
pub(crate) fn elapsed(since: DateTime<Utc>, now: DateTime<Utc>, interval: Duration) -> bool {
    (now - since).to_std().is_ok_and(|e| e >= interval)
}

pub(crate) fn after(at: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    at + chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero())
}
