// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Locations shared with the daemon, resolved from the same variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

/// CX_STATE_DIR > XDG_STATE_HOME/cx > ~/.local/state/cx
pub fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("CX_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("cx"));
    }
    dirs::home_dir()
        .map(|home| home.join(".local/state/cx"))
        .ok_or_else(|| anyhow!("could not determine state directory"))
}

pub fn socket_path(state_dir: &Path) -> PathBuf {
    state_dir.join("daemon.sock")
}

pub fn pid_path(state_dir: &Path) -> PathBuf {
    state_dir.join("daemon.pid")
}

pub fn log_path(state_dir: &Path) -> PathBuf {
    state_dir.join("daemon.log")
}

/// CX_CONFIG > XDG_CONFIG_HOME/cx/config.toml > ~/.config/cx/config.toml
pub fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("CX_CONFIG") {
        return Some(PathBuf::from(path));
    }
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg).join("cx/config.toml"));
    }
    dirs::home_dir().map(|home| home.join(".config/cx/config.toml"))
}

/// Request timeout (CX_IPC_TIMEOUT_MS, default 5s). Compaction gets longer.
pub fn ipc_timeout() -> Duration {
    std::env::var("CX_IPC_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

#[derive(Debug, Default, Deserialize)]
struct VaultConfig {
    cx_path: Option<String>,
}

/// Vault root from `cx_path` in config.toml, defaulting to `~/cx`.
pub fn vault_root() -> Result<PathBuf> {
    let configured = match config_path() {
        Some(path) => read_vault_config(&path)?.cx_path,
        None => None,
    };
    Ok(expand_home(configured.as_deref().unwrap_or("~/cx")))
}

fn read_vault_config(path: &Path) -> Result<VaultConfig> {
    match std::fs::read_to_string(path) {
        Ok(raw) => {
            toml::from_str(&raw).with_context(|| format!("invalid config {}", path.display()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(VaultConfig::default()),
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ if path == "~" => dirs::home_dir().unwrap_or_else(|| PathBuf::from(path)),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
