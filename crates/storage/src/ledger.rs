// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cost ledger: a markdown table in `costs.md`, one row per run.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use cx_core::{AgentDefinition, RunResult};
use serde::Serialize;
use tracing::debug;

use crate::StorageError;

const HEADER: &str = "# cx Cost Ledger\n\n\
| Timestamp | Agent | Mode | Categories | Cost | Input Tokens | Output Tokens | Duration |\n\
|-----------|-------|------|------------|------|-------------|--------------|----------|\n";

/// Group key used for records without categories.
pub const UNCATEGORIZED: &str = "uncategorized";

#[derive(Debug, Clone, PartialEq)]
pub struct CostRecord {
    /// `YYYY-MM-DDTHH:MM:SS`
    pub timestamp: String,
    pub agent: String,
    pub mode: String,
    pub categories: Vec<String>,
    pub cost_usd: f64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub duration_secs: f64,
}

impl CostRecord {
    pub fn from_run(def: &AgentDefinition, result: &RunResult, at: DateTime<Utc>) -> Self {
        Self {
            timestamp: at.format("%Y-%m-%dT%H:%M:%S").to_string(),
            agent: def.name.clone(),
            mode: def.mode().to_string(),
            categories: def.categories.clone(),
            cost_usd: result.cost_usd,
            input_tokens: result.input_tokens(),
            output_tokens: result.output_tokens(),
            duration_secs: result.duration_secs(),
        }
    }

    fn to_row(&self) -> String {
        let categories =
            if self.categories.is_empty() { "-".to_string() } else { self.categories.join(", ") };
        format!(
            "| {} | {} | {} | {} | ${:.4} | {} | {} | {:.1}s |\n",
            self.timestamp,
            self.agent,
            self.mode,
            categories,
            self.cost_usd,
            self.input_tokens,
            self.output_tokens,
            self.duration_secs
        )
    }

    fn parse_row(line: &str) -> Option<Self> {
        let cells: Vec<&str> = line
            .trim()
            .strip_prefix('|')?
            .strip_suffix('|')?
            .split('|')
            .map(str::trim)
            .collect();
        let [timestamp, agent, mode, categories, cost, input, output, duration] = cells[..] else {
            return None;
        };
        let categories = match categories {
            "-" | "" => Vec::new(),
            list => list.split(',').map(|c| c.trim().to_string()).collect(),
        };
        Some(Self {
            timestamp: timestamp.to_string(),
            agent: agent.to_string(),
            mode: mode.to_string(),
            categories,
            cost_usd: cost.strip_prefix('$')?.parse().ok()?,
            input_tokens: input.parse().ok()?,
            output_tokens: output.parse().ok()?,
            duration_secs: duration.strip_suffix('s')?.parse().ok()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CostLedger {
    path: PathBuf,
}

impl CostLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append one row, writing the table header first if the file is new.
    pub fn record(&self, record: &CostRecord) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(StorageError::io(parent))?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(StorageError::io(&self.path))?;
        let is_new = file.metadata().map(|m| m.len() == 0).unwrap_or(false);
        let mut out = String::new();
        if is_new {
            out.push_str(HEADER);
        }
        out.push_str(&record.to_row());
        file.write_all(out.as_bytes()).map_err(StorageError::io(&self.path))
    }

    /// All parseable rows; a missing ledger is empty.
    pub fn read(&self) -> Result<Vec<CostRecord>, StorageError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::Io { path: self.path.clone(), source: e }),
        };
        let mut records = Vec::new();
        for line in raw.lines().filter(|l| l.trim_start().starts_with('|')) {
            match CostRecord::parse_row(line) {
                Some(record) => records.push(record),
                None => debug!(line, "skipping ledger row"),
            }
        }
        Ok(records)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Agent,
    Mode,
    Category,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CostTotals {
    pub total_cost: f64,
    pub total_runs: u64,
}

/// Sum cost and count runs per group. With [`GroupBy::Category`] a record
/// counts once toward each of its categories, or toward [`UNCATEGORIZED`].
pub fn aggregate(records: &[CostRecord], by: GroupBy) -> BTreeMap<String, CostTotals> {
    let mut totals: BTreeMap<String, CostTotals> = BTreeMap::new();
    let mut add = |key: &str, record: &CostRecord| {
        let entry = totals.entry(key.to_string()).or_default();
        entry.total_cost += record.cost_usd;
        entry.total_runs += 1;
    };
    for record in records {
        match by {
            GroupBy::Agent => add(&record.agent, record),
            GroupBy::Mode => add(&record.mode, record),
            GroupBy::Category if record.categories.is_empty() => add(UNCATEGORIZED, record),
            GroupBy::Category => {
                for category in &record.categories {
                    add(category, record);
                }
            }
        }
    }
    totals
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;
