// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-demand compaction.
//!
//! Hot memory is shared with in-flight runs, so an agent with an
//! invocation in flight is refused. The agent is claimed like a run for
//! the duration of the compaction, which keeps the scheduler off it too.

use cx_adapters::ExecutionBackend;
use cx_core::Clock;
use cx_storage::StorageError;
use serde_json::json;
use tracing::{debug, warn};

use super::{ListenCtx, Reply};
use crate::memory::CompactionOutcome;
use crate::protocol::CompactTarget;

pub(super) async fn handle_compact<B: ExecutionBackend, C: Clock>(
    ctx: &ListenCtx<B, C>,
    target: CompactTarget,
) -> Reply {
    match target {
        CompactTarget::Agent(name) => compact_one(ctx, &name).await,
        CompactTarget::All => compact_all(ctx).await,
    }
}

async fn compact_one<B: ExecutionBackend, C: Clock>(ctx: &ListenCtx<B, C>, name: &str) -> Reply {
    match ctx.vault.definitions.read(name) {
        Ok(_) => {}
        Err(StorageError::NotFound(_)) => return Reply::Error(format!("Unknown agent: {name}")),
        Err(e) => return Reply::Error(e.to_string()),
    }
    if ctx.registry.is_running(name) {
        return busy(name);
    }
    let Some(_running) = ctx.state.try_begin_run(name) else {
        return busy(name);
    };

    match ctx.compactor.compact(name).await {
        Ok(CompactionOutcome::Compacted { .. }) => compacted(vec![name.to_string()]),
        Ok(CompactionOutcome::Skipped) => compacted(Vec::new()),
        Err(e) => Reply::Error(format!("Compaction failed for {name}: {e}")),
    }
}

/// Compact every idle agent that is over its threshold. Per-agent failures
/// are logged and skipped.
async fn compact_all<B: ExecutionBackend, C: Clock>(ctx: &ListenCtx<B, C>) -> Reply {
    let defs = match ctx.vault.definitions.list() {
        Ok(defs) => defs,
        Err(e) => return Reply::Error(e.to_string()),
    };

    let mut names = Vec::new();
    for def in defs.iter().filter(|d| d.memory_enabled()) {
        match ctx.compactor.should_compact(def) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                warn!(agent = %def.name, error = %e, "failed to read memory");
                continue;
            }
        }
        if ctx.registry.is_running(&def.name) {
            debug!(agent = %def.name, "running, not compacting");
            continue;
        }
        let Some(_running) = ctx.state.try_begin_run(&def.name) else {
            debug!(agent = %def.name, "running, not compacting");
            continue;
        };
        match ctx.compactor.compact(&def.name).await {
            Ok(CompactionOutcome::Compacted { .. }) => names.push(def.name.clone()),
            Ok(CompactionOutcome::Skipped) => {}
            Err(e) => warn!(agent = %def.name, error = %e, "compaction failed"),
        }
    }
    compacted(names)
}

fn busy(name: &str) -> Reply {
    Reply::Error(format!("Agent {name} is running; compact after the run finishes"))
}

fn compacted(names: Vec<String>) -> Reply {
    Reply::Ok(json!({ "compacted": names }))
}

#[cfg(test)]
#[path = "compact_tests.rs"]
mod tests;
