// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User configuration (`config.toml`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Vault root holding agents, memory, runs and costs
    pub cx_path: String,
    pub claude_path: String,
    pub default_model: String,
    pub daemon: DaemonSection,
    pub compaction: CompactionSection,
    pub notifications: NotificationsSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DaemonSection {
    pub tick_interval_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CompactionSection {
    pub default_model: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct NotificationsSection {
    pub telegram: Option<TelegramSection>,
}

/// `[notifications.telegram]`; both keys are required when present
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TelegramSection {
    pub bot_token: String,
    pub default_chat_id: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            cx_path: "~/cx".to_string(),
            claude_path: "claude".to_string(),
            default_model: "sonnet".to_string(),
            daemon: DaemonSection::default(),
            compaction: CompactionSection::default(),
            notifications: NotificationsSection::default(),
        }
    }
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self { tick_interval_seconds: 30 }
    }
}

impl Default for CompactionSection {
    fn default() -> Self {
        Self { default_model: "haiku".to_string() }
    }
}

impl DaemonConfig {
    /// Load from `path`. A missing file is the default config.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::parse(&raw, path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::Read { path: path.to_path_buf(), source: e }),
        }
    }

    fn parse(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::Parse { path: path.to_path_buf(), source: e })
    }

    /// Vault root with a leading `~` expanded.
    pub fn vault_root(&self) -> PathBuf {
        expand_home(&self.cx_path)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.daemon.tick_interval_seconds.max(1))
    }

    /// Telegram settings, unless a key is blank.
    pub fn telegram(&self) -> Option<&TelegramSection> {
        self.notifications
            .telegram
            .as_ref()
            .filter(|t| !t.bot_token.trim().is_empty() && !t.default_chat_id.trim().is_empty())
    }
}

fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return PathBuf::from(path),
    };
    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
