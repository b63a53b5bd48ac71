// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler: the tick loop that drives every agent.
//!
//! Each tick re-reads all definitions, refreshes the per-agent state mirror,
//! hands each eligible agent to its mode handler in turn and finally saves
//! the whole [`DaemonState`](cx_core::DaemonState). A failing agent is
//! logged and counted; it never aborts the tick.

mod outcome;
mod persistent;
mod scheduled;
mod watcher;

#[cfg(test)]
pub(crate) mod test_helpers;

use std::time::Duration;

use cx_adapters::{ExecutionBackend, NotifyAdapter, ProcessRegistry, WatchScriptRunner};
use cx_core::{AgentDefinition, AgentMode, Clock, DefinitionError, ScheduleError};
use cx_storage::{StateStore, StorageError};
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatch::Dispatcher;
use crate::memory::Compactor;
use crate::shared::SharedState;
use crate::vault::Vault;

/// Adapter dependencies
pub(crate) struct SchedulerDeps<B, S, N> {
    pub backend: B,
    pub scripts: S,
    pub notifier: N,
}

/// Shared state and stores the scheduler works against
pub(crate) struct SchedulerCtx {
    pub state: SharedState,
    pub registry: ProcessRegistry,
    pub vault: Vault,
    pub store: StateStore,
}

#[derive(Debug, Clone)]
pub(crate) struct SchedulerConfig {
    pub default_model: String,
    pub compaction_model: String,
    pub tick_interval: Duration,
}

/// Per-agent handler failure. Counted toward the agent's failures.
#[derive(Debug, Error)]
pub(crate) enum HandlerError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub(crate) struct Scheduler<B, S, N, C: Clock> {
    pub(crate) backend: B,
    pub(crate) scripts: S,
    pub(crate) dispatcher: Dispatcher<N>,
    pub(crate) compactor: Compactor<B, C>,
    pub(crate) state: SharedState,
    pub(crate) registry: ProcessRegistry,
    pub(crate) vault: Vault,
    pub(crate) store: StateStore,
    pub(crate) config: SchedulerConfig,
    pub(crate) clock: C,
}

impl<B, S, N, C> Scheduler<B, S, N, C>
where
    B: ExecutionBackend,
    S: WatchScriptRunner,
    N: NotifyAdapter,
    C: Clock,
{
    pub fn new(
        deps: SchedulerDeps<B, S, N>,
        ctx: SchedulerCtx,
        config: SchedulerConfig,
        clock: C,
    ) -> Self {
        let compactor = Compactor::new(
            deps.backend.clone(),
            ctx.vault.memory.clone(),
            config.compaction_model.clone(),
            clock.clone(),
        );
        Self {
            backend: deps.backend,
            scripts: deps.scripts,
            dispatcher: Dispatcher::new(deps.notifier),
            compactor,
            state: ctx.state,
            registry: ctx.registry,
            vault: ctx.vault,
            store: ctx.store,
            config,
            clock,
        }
    }

    pub fn compactor(&self) -> Compactor<B, C> {
        self.compactor.clone()
    }

    /// Tick until `shutdown` fires. The first tick runs immediately.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_ms = self.config.tick_interval.as_millis() as u64, "scheduler started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }
            self.tick(&shutdown).await;
        }
        info!("scheduler stopped");
    }

    /// One pass over every agent. Returns how many were handed to a handler.
    pub async fn tick(&self, shutdown: &CancellationToken) -> usize {
        let defs = match self.vault.definitions.list() {
            Ok(defs) => defs,
            Err(e) => {
                warn!(error = %e, "failed to list agent definitions");
                Vec::new()
            }
        };

        self.state.with(|state| {
            for def in &defs {
                state.ensure_agent(&def.name).refresh(def);
            }
        });

        let mut dispatched = 0;
        for def in &defs {
            if shutdown.is_cancelled() {
                debug!("shutdown requested, ending tick early");
                break;
            }
            if !self.is_eligible(&def.name) {
                continue;
            }
            dispatched += 1;
            if let Err(e) = self.process_agent(def).await {
                let failures = self.state.update_agent(&def.name, |a| a.record_failure());
                warn!(agent = %def.name, ?failures, error = %e, "agent handler failed");
            }
        }

        self.save();
        dispatched
    }

    /// Not paused or stopped, and nothing in flight for this name.
    fn is_eligible(&self, name: &str) -> bool {
        let Some(agent) = self.state.agent(name) else {
            return false;
        };
        agent.status.is_schedulable() && !agent.running && !self.registry.is_running(name)
    }

    async fn process_agent(&self, def: &AgentDefinition) -> Result<(), HandlerError> {
        def.validate()?;
        match def.mode() {
            AgentMode::Scheduled => self.handle_scheduled(def).await,
            AgentMode::Watcher => self.handle_watcher(def).await,
            AgentMode::Persistent => self.handle_persistent(def).await,
        }
    }

    /// Persist the full state. Failures are retried on the next tick.
    pub fn save(&self) {
        let snapshot = self.state.snapshot();
        if let Err(e) = self.store.save(&snapshot, self.clock.now()) {
            warn!(path = %self.store.path().display(), error = %e, "failed to save daemon state");
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
