// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon state persistence for crash recovery.
//!
//! The whole [`DaemonState`] is written after every tick. A missing file
//! means a fresh start; an unreadable one is moved aside to a `.bak` and
//! treated as missing so the daemon can still come up.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use cx_core::DaemonState;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{write_atomic, StorageError};

/// Current state file schema version
pub const CURRENT_STATE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    #[serde(rename = "v")]
    version: u32,
    saved_at: DateTime<Utc>,
    state: DaemonState,
}

#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the last saved state, or `None` when there is nothing usable.
    pub fn load(&self) -> Result<Option<DaemonState>, StorageError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io { path: self.path.clone(), source: e }),
        };

        match serde_json::from_slice::<StateFile>(&raw) {
            Ok(file) => Ok(Some(file.state)),
            Err(e) => {
                let bak = rotate_bak_path(&self.path);
                warn!(
                    path = %self.path.display(),
                    backup = %bak.display(),
                    error = %e,
                    "corrupt daemon state, starting empty"
                );
                fs::rename(&self.path, &bak).map_err(StorageError::io(&bak))?;
                Ok(None)
            }
        }
    }

    pub fn save(&self, state: &DaemonState, now: DateTime<Utc>) -> Result<(), StorageError> {
        let file = StateFile { version: CURRENT_STATE_VERSION, saved_at: now, state: state.clone() };
        let json = serde_json::to_vec_pretty(&file)?;
        write_atomic(&self.path, &json)
    }
}

const MAX_BAK_FILES: u32 = 3;

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
///
/// Keeps up to [`MAX_BAK_FILES`] backups: `.bak`, `.bak.2`, `.bak.3`.
/// The oldest backup is removed when the limit is reached.
pub(crate) fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }

    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }

    bak(1)
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
