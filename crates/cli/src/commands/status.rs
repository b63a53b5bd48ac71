// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `cx status`

use anyhow::Result;
use chrono::{DateTime, Utc};
use cx_core::{AgentStatus, DaemonAgentState, DaemonState};

use super::client_error;
use crate::client::DaemonClient;
use crate::color;
use crate::output::{format_elapsed, format_or_json, format_time_ago, OutputFormat, Table};

pub async fn handle(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let state = client.status().await.map_err(client_error)?;
    format_or_json(format, &state, || println!("{}", render(&state, Utc::now())))
}

pub(crate) fn render(state: &DaemonState, now: DateTime<Utc>) -> String {
    let uptime = (now - state.started_at).num_seconds().max(0) as u64;
    let mut out = format!("Daemon: running (pid {}, up {})", state.pid, format_elapsed(uptime));
    if state.agents.is_empty() {
        out.push_str("\nNo agents");
        return out;
    }

    let mut table =
        Table::new(vec!["AGENT", "MODE", "STATUS", "FAILURES", "LAST RUN", "NEXT RUN"]);
    for agent in state.agents.values() {
        table.row(vec![
            agent.name.clone(),
            agent.mode.map(|m| m.to_string()).unwrap_or_else(|| "-".to_string()),
            status_cell(agent),
            agent.consecutive_failures.to_string(),
            format_time_ago(agent.last_run, now),
            agent
                .next_run
                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    out.push_str("\n\n");
    out.push_str(&table.render());
    out
}

fn status_cell(agent: &DaemonAgentState) -> String {
    let label = if agent.running {
        format!("{} (running)", agent.status)
    } else {
        agent.status.to_string()
    };
    match agent.status {
        AgentStatus::Active => label,
        AgentStatus::Failed => color::failed(&label),
        AgentStatus::Paused | AgentStatus::Stopped => color::muted(&label),
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
