// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The file-backed stores rooted at one vault directory.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use cx_core::{AgentDefinition, RunResult, StatsPatch};
use cx_storage::{
    load_secrets, CostLedger, CostRecord, DefinitionStore, MemoryStore, RunLogger, VaultPaths,
};
use tracing::warn;

#[derive(Debug, Clone)]
pub(crate) struct Vault {
    pub paths: VaultPaths,
    pub definitions: DefinitionStore,
    pub memory: MemoryStore,
    pub runs: RunLogger,
    pub ledger: CostLedger,
}

impl Vault {
    pub fn new(paths: VaultPaths) -> Self {
        Self {
            definitions: DefinitionStore::new(paths.clone()),
            memory: MemoryStore::new(paths.clone()),
            runs: RunLogger::new(paths.clone()),
            ledger: CostLedger::new(paths.costs_file()),
            paths,
        }
    }

    /// Secrets for `def`, or an empty map if they cannot be read.
    pub fn secrets(&self, def: &AgentDefinition) -> BTreeMap<String, String> {
        match load_secrets(&self.paths.secrets_dir(), def.env_ref.as_deref()) {
            Ok(env) => env,
            Err(e) => {
                warn!(agent = %def.name, error = %e, "failed to load secrets");
                BTreeMap::new()
            }
        }
    }

    /// Append to the run log. Best effort.
    pub fn log_run(&self, def: &AgentDefinition, result: &RunResult, at: DateTime<Utc>) {
        if let Err(e) = self.runs.log(def, result, at) {
            warn!(agent = %def.name, error = %e, "failed to write run log");
        }
    }

    /// Record cost in the ledger and the definition's stats. Best effort.
    pub fn record_cost(&self, def: &AgentDefinition, result: &RunResult, at: DateTime<Utc>) {
        if let Err(e) = self.ledger.record(&CostRecord::from_run(def, result, at)) {
            warn!(agent = %def.name, error = %e, "failed to record cost");
        }
        let patch = StatsPatch {
            cost_usd: result.cost_usd,
            at: cx_core::memory::timestamp(at),
            is_error: result.is_error,
        };
        if let Err(e) = self.definitions.update_stats(&def.name, &patch) {
            warn!(agent = %def.name, error = %e, "failed to update agent stats");
        }
    }
}

#[cfg(test)]
#[path = "vault_tests.rs"]
mod tests;
