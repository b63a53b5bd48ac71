// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Context builder: the prompt for one invocation.

use cx_core::{AgentDefinition, HotMemory};
use cx_storage::StorageError;
use tracing::debug;

use crate::vault::Vault;

/// Entries of hot memory included in a prompt
pub(crate) const RECENT_ENTRIES: usize = 5;
/// Archives included in a prompt, newest last
pub(crate) const RECENT_ARCHIVES: usize = 3;

const SEPARATOR: &str = "\n\n---\n\n";

/// Everything the prompt is made of, already loaded.
#[derive(Debug, Clone, Default)]
pub(crate) struct ContextInputs<'a> {
    pub body: &'a str,
    pub memory: Option<&'a HotMemory>,
    /// `(period, content)` pairs, oldest first
    pub archives: &'a [(String, String)],
    pub watcher_context: Option<&'a str>,
}

/// Join the non-empty parts in order: instructions, persistent notes,
/// recent entries, archives, watcher context.
pub(crate) fn build_context(inputs: &ContextInputs<'_>) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !inputs.body.trim().is_empty() {
        parts.push(inputs.body.to_string());
    }

    if let Some(memory) = inputs.memory {
        if !memory.persistent_notes().is_empty() {
            parts.push(format!("## Persistent Notes\n\n{}", memory.persistent_notes()));
        }
        let recent = memory.recent(RECENT_ENTRIES);
        if !recent.is_empty() {
            let entries = recent
                .iter()
                .map(|e| format!("### {} [{}]\n{}", e.timestamp, e.kind, e.content))
                .collect::<Vec<_>>()
                .join("\n\n");
            parts.push(format!("## Recent Memory\n\n{entries}"));
        }
    }

    let skip = inputs.archives.len().saturating_sub(RECENT_ARCHIVES);
    for (period, content) in &inputs.archives[skip..] {
        parts.push(format!("## Archive: {period}\n\n{content}"));
    }

    if let Some(ctx) = inputs.watcher_context.filter(|c| !c.is_empty()) {
        parts.push(format!("## Watcher Context\n\n{ctx}"));
    }

    parts.join(SEPARATOR)
}

/// Load memory and archives for `def` and build its prompt.
///
/// Memory sections honour the agent's memory policy. Unreadable archives
/// are skipped.
pub(crate) fn load_context(
    vault: &Vault,
    def: &AgentDefinition,
    watcher_context: Option<&str>,
) -> Result<String, StorageError> {
    let memory = if def.memory_enabled() { Some(vault.memory.read_hot(&def.name)?) } else { None };

    let mut archives = Vec::new();
    if def.memory_enabled() && def.archive_access() {
        let periods = vault.memory.list_archives(&def.name)?;
        let skip = periods.len().saturating_sub(RECENT_ARCHIVES);
        for period in &periods[skip..] {
            match vault.memory.read_archive(&def.name, period) {
                Ok(content) => archives.push((period.clone(), content)),
                Err(e) => debug!(agent = %def.name, %period, error = %e, "skipping archive"),
            }
        }
    }

    Ok(build_context(&ContextInputs {
        body: &def.body,
        memory: memory.as_ref(),
        archives: &archives,
        watcher_context,
    }))
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
