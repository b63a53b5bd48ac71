// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervised subprocess execution.

use std::process::{Output, Stdio};
use std::time::Duration;

use nix::sys::signal::Signal;
use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::registry::send;
use crate::ProcessRegistry;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("{description}: failed to spawn: {source}")]
    Spawn {
        description: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{description}: failed to collect output: {source}")]
    Wait {
        description: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{description} timed out after {}s", timeout.as_secs())]
    Timeout { description: String, timeout: Duration },
    #[error("{description} cancelled")]
    Cancelled { description: String },
}

/// Registry and cancellation shared by every spawn.
///
/// Cancelling the token kills all in-flight children; the registry sees each
/// child for exactly as long as it is awaited.
#[derive(Debug, Clone, Default)]
pub struct Supervision {
    pub registry: ProcessRegistry,
    pub cancel: CancellationToken,
}

impl Supervision {
    pub fn new(registry: ProcessRegistry, cancel: CancellationToken) -> Self {
        Self { registry, cancel }
    }
}

/// Run `cmd` to completion under `agent`'s registry entry.
///
/// The child leads its own process group so shutdown and timeouts reach
/// anything it spawns. On timeout or cancellation the group is killed. A
/// child that exits while the registry is draining reports `Cancelled`
/// rather than its exit status, and no child is spawned once draining.
pub async fn run_with_timeout(
    mut cmd: Command,
    agent: &str,
    timeout: Duration,
    supervision: &Supervision,
    description: &str,
) -> Result<Output, ProcessError> {
    let cancelled = || ProcessError::Cancelled { description: description.to_string() };
    if supervision.registry.is_draining() || supervision.cancel.is_cancelled() {
        return Err(cancelled());
    }
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .kill_on_drop(true);

    let child = cmd
        .spawn()
        .map_err(|source| ProcessError::Spawn { description: description.to_string(), source })?;
    let pid = child.id();
    let _guard = pid.map(|pid| supervision.registry.register(agent, pid));
    let kill_group = || {
        if let Some(pid) = pid {
            send(pid, Signal::SIGKILL, agent);
        }
    };

    tokio::select! {
        output = child.wait_with_output() => {
            if supervision.registry.is_draining() {
                return Err(cancelled());
            }
            output.map_err(|source| ProcessError::Wait { description: description.to_string(), source })
        }
        _ = tokio::time::sleep(timeout) => {
            tracing::warn!(agent, description, timeout_secs = timeout.as_secs(), "child timed out");
            kill_group();
            Err(ProcessError::Timeout { description: description.to_string(), timeout })
        }
        _ = supervision.cancel.cancelled() => {
            kill_group();
            Err(cancelled())
        }
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
