// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `cx costs [--by agent|mode|category] [--period PREFIX]`: totals from the
//! vault's cost ledger.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use clap::ValueEnum;
use cx_storage::{aggregate, CostLedger, CostRecord, CostTotals, GroupBy, VaultPaths};
use serde_json::json;

use crate::output::{format_or_json, OutputFormat, Table};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum CostGrouping {
    #[default]
    Agent,
    Mode,
    Category,
}

impl From<CostGrouping> for GroupBy {
    fn from(by: CostGrouping) -> Self {
        match by {
            CostGrouping::Agent => GroupBy::Agent,
            CostGrouping::Mode => GroupBy::Mode,
            CostGrouping::Category => GroupBy::Category,
        }
    }
}

pub fn handle(
    vault_root: &Path,
    by: CostGrouping,
    period: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let ledger = CostLedger::new(VaultPaths::new(vault_root).costs_file());
    let records = in_period(ledger.read()?, period);
    let groups = aggregate(&records, by.into());
    let total: f64 = records.iter().map(|r| r.cost_usd).sum();
    let obj = json!({ "groups": groups, "total_cost": total, "total_runs": records.len() });
    format_or_json(format, &obj, || print!("{}", render(&groups, by, total, records.len())))
}

/// Records whose timestamp starts with `period` (`2026`, `2026-03`, `2026-03-01`).
pub(crate) fn in_period(mut records: Vec<CostRecord>, period: Option<&str>) -> Vec<CostRecord> {
    if let Some(period) = period {
        records.retain(|r| r.timestamp.starts_with(period));
    }
    records
}

pub(crate) fn render(
    groups: &BTreeMap<String, CostTotals>,
    by: CostGrouping,
    total: f64,
    runs: usize,
) -> String {
    if groups.is_empty() {
        return "No runs recorded\n".to_string();
    }
    let label = match by {
        CostGrouping::Agent => "AGENT",
        CostGrouping::Mode => "MODE",
        CostGrouping::Category => "CATEGORY",
    };
    let mut table = Table::new(vec![label, "RUNS", "COST"]);
    for (key, totals) in groups {
        table.row(vec![
            key.clone(),
            totals.total_runs.to_string(),
            format!("${:.4}", totals.total_cost),
        ]);
    }
    format!("{}\n\nTotal: ${:.4} over {} runs\n", table.render(), total, runs)
}

#[cfg(test)]
#[path = "costs_tests.rs"]
mod tests;
