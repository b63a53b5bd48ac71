// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, services, shutdown.

mod startup;
pub(crate) use startup::startup;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use cx_adapters::{ExecutionBackend, NotifyAdapter, ProcessRegistry, WatchScriptRunner};
use cx_core::Clock;
use cx_storage::{StateStore, StorageError};
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::ConfigError;
use crate::env::drain_timeout;
use crate::listener::{ListenCtx, Listener};
use crate::scheduler::Scheduler;
use crate::shared::SharedState;
use crate::watch::{self, DefinitionWatcher};

/// Daemon file locations
#[derive(Debug, Clone)]
pub(crate) struct Config {
    /// Root state directory (e.g. ~/.local/state/cx)
    pub state_dir: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Path to the daemon state snapshot
    pub state_path: PathBuf,
}

impl Config {
    /// Paths under the user's state directory (`CX_STATE_DIR` or the XDG default).
    pub fn load() -> Result<Self, LifecycleError> {
        Ok(Self::in_dir(crate::env::state_dir()?))
    }

    pub fn in_dir(state_dir: impl AsRef<Path>) -> Self {
        let state_dir = state_dir.as_ref().to_path_buf();
        Self {
            socket_path: state_dir.join("daemon.sock"),
            lock_path: state_dir.join("daemon.pid"),
            log_path: state_dir.join("daemon.log"),
            state_path: state_dir.join("daemon-state.json"),
            state_dir,
        }
    }
}

/// A started daemon: holds the lock and owns every background task.
pub(crate) struct Daemon {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub state: SharedState,
    pub store: StateStore,
    pub registry: ProcessRegistry,
    /// Hard-kills supervised children when cancelled
    pub kill: CancellationToken,
    scheduler_stop: CancellationToken,
    listener_stop: CancellationToken,
    scheduler: Option<JoinHandle<()>>,
    listener: Option<JoinHandle<()>>,
    watcher: Option<DefinitionWatcher>,
    shut_down: bool,
}

/// Result of daemon startup: the daemon and its bound socket.
pub(crate) struct StartupResult {
    pub daemon: Daemon,
    /// The Unix socket listener to hand to a Listener task
    pub listener: UnixListener,
}

impl Daemon {
    pub fn spawn_scheduler<B, S, N, C>(&mut self, scheduler: Scheduler<B, S, N, C>)
    where
        B: ExecutionBackend,
        S: WatchScriptRunner,
        N: NotifyAdapter,
        C: Clock,
    {
        let stop = self.scheduler_stop.clone();
        self.scheduler = Some(tokio::spawn(scheduler.run(stop)));
    }

    pub fn spawn_listener<B, C>(&mut self, unix: UnixListener, ctx: Arc<ListenCtx<B, C>>)
    where
        B: ExecutionBackend,
        C: Clock,
    {
        let stop = self.listener_stop.clone();
        self.listener = Some(tokio::spawn(Listener::new(unix, ctx).run(stop)));
    }

    /// Prune state of agents whose definition file is deleted.
    pub fn watch_definitions(&mut self, agents_dir: &Path) -> Result<(), LifecycleError> {
        let watcher = watch::spawn(agents_dir, self.state.clone(), self.listener_stop.clone())?;
        self.watcher = Some(watcher);
        Ok(())
    }

    /// Shutdown the daemon gracefully. Safe to call more than once.
    ///
    /// Order: stop ticking, drain children (graceful, then forced), join
    /// the scheduler, close the listener, save state, release the pid file.
    pub async fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        info!("Shutting down daemon...");

        // 1. No new ticks
        self.scheduler_stop.cancel();

        // 2. Children get SIGTERM and the drain period, then SIGKILL
        let terminated = self.registry.terminate_all(drain_timeout()).await;
        if terminated > 0 {
            info!(count = terminated, "terminated running agents");
        }
        self.kill.cancel();

        if let Some(task) = self.scheduler.take() {
            if let Err(e) = task.await {
                warn!("Scheduler task failed: {}", e);
            }
        }

        // 3. Close the control socket
        self.listener_stop.cancel();
        if let Some(task) = self.listener.take() {
            let _ = task.await;
        }
        if let Some(watcher) = self.watcher.take() {
            let _ = watcher.task.await;
        }
        if self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!("Failed to remove socket file: {}", e);
            }
        }

        // 4. Final snapshot
        if let Err(e) = self.store.save(&self.state.snapshot(), Utc::now()) {
            warn!("Failed to save final state: {}", e);
        }

        // 5. Remove PID file; the lock itself goes with lock_file
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        info!("Daemon shutdown complete");
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("State error: {0}")]
    Storage(#[from] StorageError),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
