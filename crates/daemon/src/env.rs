// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Resolve state directory: CX_STATE_DIR > XDG_STATE_HOME/cx > ~/.local/state/cx
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("CX_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("cx"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/cx"))
}

/// Resolve config file: CX_CONFIG > XDG_CONFIG_HOME/cx/config.toml > ~/.config/cx/config.toml
pub fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("CX_CONFIG") {
        return Some(PathBuf::from(path));
    }
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg).join("cx/config.toml"));
    }
    dirs::home_dir().map(|home| home.join(".config/cx/config.toml"))
}

/// Default IPC timeout
pub fn ipc_timeout() -> Duration {
    duration_ms("CX_IPC_TIMEOUT_MS").unwrap_or(Duration::from_secs(5))
}

/// Grace period for child processes on shutdown (default 5s).
pub fn drain_timeout() -> Duration {
    duration_ms("CX_DRAIN_TIMEOUT_MS").unwrap_or(Duration::from_secs(5))
}

/// Tick interval override
pub fn tick_interval_ms() -> Option<Duration> {
    duration_ms("CX_TICK_INTERVAL_MS")
}

fn duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var).ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_millis)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
