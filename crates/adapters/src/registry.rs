// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live child processes, keyed by agent name.
//!
//! Every spawn registers before it is awaited and deregisters when the
//! [`RegistrationGuard`] drops, so liveness answers are never stale. On
//! shutdown [`ProcessRegistry::terminate_all`] marks the registry draining,
//! sends SIGTERM to each child's process group, waits for the grace period
//! and SIGKILLs whatever is left.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub pid: u32,
    pub started_at: Instant,
}

#[derive(Debug, Default)]
struct RegistryInner {
    entries: HashMap<String, RegistryEntry>,
    draining: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ProcessRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `pid` under `name` until the returned guard drops.
    pub fn register(&self, name: &str, pid: u32) -> RegistrationGuard {
        tracing::debug!(agent = name, pid, "registered child process");
        self.inner
            .lock()
            .entries
            .insert(name.to_string(), RegistryEntry { pid, started_at: Instant::now() });
        RegistrationGuard { registry: self.clone(), name: name.to_string(), pid }
    }

    /// Remove the entry for `name` if it still belongs to `pid`.
    pub fn deregister(&self, name: &str, pid: u32) {
        let mut inner = self.inner.lock();
        if inner.entries.get(name).is_some_and(|e| e.pid == pid) {
            inner.entries.remove(name);
            tracing::debug!(agent = name, pid, "deregistered child process");
        }
    }

    /// True iff a process is registered for `name` and has not exited.
    pub fn is_running(&self, name: &str) -> bool {
        let pid = self.inner.lock().entries.get(name).map(|e| e.pid);
        pid.is_some_and(is_alive)
    }

    pub fn entry(&self, name: &str) -> Option<RegistryEntry> {
        self.inner.lock().entries.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// True once [`terminate_all`](Self::terminate_all) has started. Children
    /// that exit from then on were stopped by the daemon, not by failure.
    pub fn is_draining(&self) -> bool {
        self.inner.lock().draining
    }

    /// SIGTERM every child, wait up to `grace`, SIGKILL the rest, clear.
    ///
    /// Returns the number of processes that were signalled.
    pub async fn terminate_all(&self, grace: Duration) -> usize {
        let targets: Vec<(String, u32)> = {
            let mut inner = self.inner.lock();
            inner.draining = true;
            inner.entries.iter().map(|(name, e)| (name.clone(), e.pid)).collect()
        };
        if targets.is_empty() {
            return 0;
        }

        tracing::info!(count = targets.len(), "terminating child processes");
        for (name, pid) in &targets {
            send(*pid, Signal::SIGTERM, name);
        }

        let deadline = Instant::now() + grace;
        loop {
            let alive: Vec<&(String, u32)> = targets
                .iter()
                .filter(|(name, pid)| self.tracks(name, *pid) && is_alive(*pid))
                .collect();
            if alive.is_empty() {
                break;
            }
            if Instant::now() >= deadline {
                for (name, pid) in alive {
                    tracing::warn!(agent = %name, pid, "child ignored SIGTERM, killing");
                    send(*pid, Signal::SIGKILL, name);
                }
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        self.inner.lock().entries.clear();
        targets.len()
    }

    fn tracks(&self, name: &str, pid: u32) -> bool {
        self.inner.lock().entries.get(name).is_some_and(|e| e.pid == pid)
    }
}

/// Deregisters its process when dropped.
#[derive(Debug)]
pub struct RegistrationGuard {
    registry: ProcessRegistry,
    name: String,
    pid: u32,
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        self.registry.deregister(&self.name, self.pid);
    }
}

fn to_pid(pid: u32) -> Option<Pid> {
    i32::try_from(pid).ok().filter(|p| *p > 0).map(Pid::from_raw)
}

/// The process, or anything left in its process group, still exists.
fn is_alive(pid: u32) -> bool {
    to_pid(pid).is_some_and(|p| killpg(p, None).is_ok() || kill(p, None).is_ok())
}

/// Signal the child's process group so grandchildren go too. Falls back to
/// the pid alone when the child does not lead a group.
pub(crate) fn send(pid: u32, signal: Signal, name: &str) {
    let Some(target) = to_pid(pid) else {
        return;
    };
    if let Err(e) = killpg(target, signal).or_else(|_| kill(target, signal)) {
        tracing::debug!(agent = name, pid, ?signal, error = %e, "signal not delivered");
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
