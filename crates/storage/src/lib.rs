// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cx-storage: file-backed stores for definitions, state, memory and ledgers

mod definitions;
mod ledger;
mod memory;
mod paths;
mod run_log;
mod secrets;
mod snapshot;

use std::path::PathBuf;

use thiserror::Error;

pub use definitions::DefinitionStore;
pub use ledger::{aggregate, CostLedger, CostRecord, CostTotals, GroupBy, UNCATEGORIZED};
pub use memory::MemoryStore;
pub use paths::VaultPaths;
pub use run_log::RunLogger;
pub use secrets::{load_secrets, parse_env};
pub use snapshot::{StateStore, CURRENT_STATE_VERSION};

/// Errors from the file-backed stores
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid frontmatter in {path}: {source}")]
    Frontmatter {
        path: PathBuf,
        #[source]
        source: cx_core::frontmatter::FrontmatterError,
    },
    #[error("invalid definition {path}: {source}")]
    Definition {
        path: PathBuf,
        #[source]
        source: cx_core::DefinitionError,
    },
    #[error("agent '{0}' not found")]
    NotFound(String),
    #[error("archive {0} already exists")]
    ArchiveExists(PathBuf),
    #[error(transparent)]
    Memory(#[from] cx_core::MemoryParseError),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| StorageError::Io { path, source }
    }
}

/// Write via a temp file and rename so readers never observe a partial file.
pub(crate) fn write_atomic(path: &std::path::Path, contents: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(StorageError::io(parent))?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, contents).map_err(StorageError::io(&tmp))?;
    std::fs::rename(&tmp, path).map_err(StorageError::io(path))?;
    Ok(())
}
