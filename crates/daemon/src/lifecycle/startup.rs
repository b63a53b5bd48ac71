// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and initialization logic.

use std::io::Write;

use chrono::Utc;
use cx_adapters::ProcessRegistry;
use cx_core::DaemonState;
use cx_storage::StateStore;
use fs2::FileExt;
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{Config, Daemon, LifecycleError, StartupResult};
use crate::shared::SharedState;

/// Start the daemon
pub(crate) async fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // On a lock failure the files belong to the running daemon
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

/// Startup proper; `startup` cleans up after any failure but the lock
async fn startup_inner(config: &Config) -> Result<StartupResult, LifecycleError> {
    // 1. Create state directory (needed for socket, lock, etc.)
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Take the lock before anything else. Open without truncating so a
    // losing race cannot wipe the running daemon's PID.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;

    // Write PID to lock file (truncate now that we hold the lock)
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file; // Drop mutability

    // 3. Recover state from the last snapshot
    let store = StateStore::new(&config.state_path);
    let pid = std::process::id();
    let now = Utc::now();
    let state = match store.load()? {
        Some(previous) => {
            info!(
                agents = previous.agents.len(),
                previous_pid = previous.pid,
                "Recovered daemon state"
            );
            previous.recover(pid, now)
        }
        None => {
            info!("No daemon state found, starting empty");
            DaemonState::new(pid, now)
        }
    };

    // 4. Replace any stale socket and bind last
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    info!(pid, socket = %config.socket_path.display(), "Daemon started");

    Ok(StartupResult {
        daemon: Daemon {
            config: config.clone(),
            lock_file,
            state: SharedState::new(state),
            store,
            registry: ProcessRegistry::new(),
            kill: CancellationToken::new(),
            scheduler_stop: CancellationToken::new(),
            listener_stop: CancellationToken::new(),
            scheduler: None,
            listener: None,
            watcher: None,
            shut_down: false,
        },
        listener,
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    // Remove socket if we created it
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }

    // Remove PID/lock file
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
