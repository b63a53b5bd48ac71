// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Owner of the live [`DaemonState`], shared by the scheduler, the IPC
//! listener and the definition watcher.
//!
//! Every access is a short closure under a `parking_lot` mutex; no lock is
//! ever held across an await point.

use std::sync::Arc;

use cx_core::{DaemonAgentState, DaemonState};
use parking_lot::Mutex;

#[derive(Clone)]
pub(crate) struct SharedState {
    inner: Arc<Mutex<DaemonState>>,
}

impl SharedState {
    pub fn new(state: DaemonState) -> Self {
        Self { inner: Arc::new(Mutex::new(state)) }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut DaemonState) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Run `f` on the entry for `name`, creating it if absent.
    pub fn with_agent<R>(&self, name: &str, f: impl FnOnce(&mut DaemonAgentState) -> R) -> R {
        f(self.inner.lock().ensure_agent(name))
    }

    /// Run `f` on the entry for `name` only if it still exists.
    ///
    /// Post-run bookkeeping goes through here so an agent pruned while its
    /// run was in flight is not brought back.
    pub fn update_agent<R>(
        &self,
        name: &str,
        f: impl FnOnce(&mut DaemonAgentState) -> R,
    ) -> Option<R> {
        self.inner.lock().agent_mut(name).map(f)
    }

    pub fn agent(&self, name: &str) -> Option<DaemonAgentState> {
        self.inner.lock().agent(name).cloned()
    }

    pub fn snapshot(&self) -> DaemonState {
        self.inner.lock().clone()
    }

    /// Claim exclusive use of `name` for one invocation.
    ///
    /// Returns `None` if the agent is already marked running. The flag is
    /// cleared when the guard drops, on every exit path.
    pub fn try_begin_run(&self, name: &str) -> Option<RunningGuard> {
        let mut state = self.inner.lock();
        let agent = state.ensure_agent(name);
        if agent.running {
            return None;
        }
        agent.running = true;
        Some(RunningGuard { state: self.clone(), name: name.to_string() })
    }
}

/// Holds an agent's `running` flag for the lifetime of one invocation.
pub(crate) struct RunningGuard {
    state: SharedState,
    name: String,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        if let Some(agent) = self.state.inner.lock().agent_mut(&self.name) {
            agent.running = false;
        }
    }
}

#[cfg(test)]
#[path = "shared_tests.rs"]
mod tests;
