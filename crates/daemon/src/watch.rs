// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Definition-change watcher.
//!
//! Scheduling never depends on this: every tick re-reads the definitions.
//! The watcher only drops the state of agents whose file is deleted, so
//! status and snapshots stop reporting them.

use std::path::{Path, PathBuf};

use notify::event::ModifyKind;
use notify::{Event as NotifyEvent, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::shared::SharedState;

/// Keeps the OS watch alive; dropping it stops notifications.
pub(crate) struct DefinitionWatcher {
    _watcher: RecommendedWatcher,
    pub task: JoinHandle<()>,
}

/// Watch `agents_dir` until `shutdown` fires.
pub(crate) fn spawn(
    agents_dir: &Path,
    state: SharedState,
    shutdown: CancellationToken,
) -> Result<DefinitionWatcher, notify::Error> {
    std::fs::create_dir_all(agents_dir).map_err(notify::Error::io)?;

    let (tx, mut rx) = mpsc::channel::<PathBuf>(64);
    let mut watcher = notify::recommended_watcher(move |res: Result<NotifyEvent, _>| match res {
        Ok(event) if is_removal(&event.kind) => {
            for path in event.paths {
                let _ = tx.blocking_send(path);
            }
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "definition watch error"),
    })?;
    watcher.watch(agents_dir, RecursiveMode::NonRecursive)?;
    info!(dir = %agents_dir.display(), "watching agent definitions");

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                path = rx.recv() => match path {
                    Some(path) => {
                        prune_removed(&state, &path);
                    }
                    None => break,
                },
            }
        }
        debug!("definition watcher stopped");
    });

    Ok(DefinitionWatcher { _watcher: watcher, task })
}

/// Deletes, and renames (the old name no longer exists afterwards).
fn is_removal(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_)))
}

/// Drop the state for the agent defined at `path` if that file is gone.
///
/// Returns the name of the pruned agent.
pub(crate) fn prune_removed(state: &SharedState, path: &Path) -> Option<String> {
    if path.extension().and_then(|e| e.to_str()) != Some("md") || path.exists() {
        return None;
    }
    let name = path.file_stem()?.to_str()?.to_string();
    let removed = state.with(|s| s.remove_agent(&name))?;
    info!(agent = %removed.name, "definition deleted, dropping agent state");
    Some(name)
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
