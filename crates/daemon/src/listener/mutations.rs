// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status changes requested over IPC.
//!
//! These touch daemon state only, never the definition files. Each is held
//! as an override so the next tick's refresh keeps it.

use cx_core::AgentStatus;
use tracing::info;

use super::{ListenCtx, Reply};

/// Make the agent schedulable again. Unknown names get a default entry.
pub(super) fn handle_start<B, C>(ctx: &ListenCtx<B, C>, name: &str) -> Reply {
    ctx.state.with_agent(name, |a| a.override_status(AgentStatus::Active));
    info!(agent = name, "agent started over IPC");
    Reply::message(format!("Agent {name} will run on next tick"))
}

pub(super) fn handle_stop<B, C>(ctx: &ListenCtx<B, C>, name: &str) -> Reply {
    ctx.state.with_agent(name, |a| a.override_status(AgentStatus::Stopped));
    info!(agent = name, "agent stopped over IPC");
    Reply::message(format!("Agent {name} stopped"))
}

pub(super) fn handle_pause<B, C>(ctx: &ListenCtx<B, C>, name: &str) -> Reply {
    ctx.state.with_agent(name, |a| a.override_status(AgentStatus::Paused));
    info!(agent = name, "agent paused over IPC");
    Reply::message(format!("Agent {name} paused"))
}

/// Like start, but also clears the failure count.
pub(super) fn handle_resume<B, C>(ctx: &ListenCtx<B, C>, name: &str) -> Reply {
    ctx.state.with_agent(name, |a| {
        a.override_status(AgentStatus::Active);
        a.reset_failures();
    });
    info!(agent = name, "agent resumed over IPC");
    Reply::message(format!("Agent {name} resumed"))
}

#[cfg(test)]
#[path = "mutations_tests.rs"]
mod tests;
