// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `cx list`: agent definitions in the vault, read without the daemon.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use cx_core::{AgentDefinition, AgentStatus};
use cx_storage::{DefinitionStore, VaultPaths};
use serde_json::json;

use crate::color;
use crate::output::{format_or_json, OutputFormat, Table};

#[derive(Args, Clone, Debug, Default, PartialEq)]
pub struct ListFilter {
    /// Only agents in this mode (scheduled, watcher, persistent)
    #[arg(long)]
    pub mode: Option<String>,
    /// Only agents tagged with this category
    #[arg(long)]
    pub category: Option<String>,
    /// Only agents with this status
    #[arg(long)]
    pub status: Option<String>,
}

impl ListFilter {
    pub(crate) fn matches(&self, def: &AgentDefinition) -> bool {
        self.mode.as_deref().is_none_or(|m| def.mode().to_string() == m)
            && self.category.as_deref().is_none_or(|c| def.categories.iter().any(|dc| dc == c))
            && self.status.as_deref().is_none_or(|s| def.status.to_string() == s)
    }
}

pub fn handle(vault_root: &Path, filter: &ListFilter, format: OutputFormat) -> Result<()> {
    let store = DefinitionStore::new(VaultPaths::new(vault_root));
    let defs: Vec<AgentDefinition> =
        store.list()?.into_iter().filter(|d| filter.matches(d)).collect();
    let obj: Vec<_> = defs
        .iter()
        .map(|d| {
            json!({
                "name": d.name,
                "mode": d.mode(),
                "status": d.status,
                "categories": d.categories,
                "schedule": schedule_cell(d),
                "last_run": d.stats.last_run,
                "total_runs": d.stats.total_runs,
                "total_cost_usd": d.stats.total_cost_usd,
            })
        })
        .collect();
    format_or_json(format, &obj, || print!("{}", render(&defs)))
}

pub(crate) fn render(defs: &[AgentDefinition]) -> String {
    if defs.is_empty() {
        return "No agents found\n".to_string();
    }
    let mut table = Table::new(vec!["NAME", "MODE", "STATUS", "SCHEDULE", "LAST RUN", "RUNS"]);
    for def in defs {
        table.row(vec![
            def.name.clone(),
            def.mode().to_string(),
            status_cell(def.status),
            schedule_cell(def),
            def.stats.last_run.clone().unwrap_or_else(|| "-".to_string()),
            def.stats.total_runs.to_string(),
        ]);
    }
    format!("{}\n", table.render())
}

/// Cron expression for scheduled agents, poll interval for watchers.
fn schedule_cell(def: &AgentDefinition) -> String {
    if let Some(schedule) = &def.execution.schedule {
        return schedule.expression.clone();
    }
    match &def.execution.watcher {
        Some(watcher) => format!("every {}s", watcher.poll_interval().as_secs()),
        None => "-".to_string(),
    }
}

fn status_cell(status: AgentStatus) -> String {
    match status {
        AgentStatus::Active => status.to_string(),
        AgentStatus::Failed => color::failed(&status.to_string()),
        AgentStatus::Paused | AgentStatus::Stopped => color::muted(&status.to_string()),
    }
}

#[cfg(test)]
#[path = "list_tests.rs"]
mod tests;
