// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `cx memory <name>`: print an agent's hot memory from the vault.

use std::path::Path;

use anyhow::Result;
use cx_core::HotMemory;
use cx_storage::{MemoryStore, VaultPaths};
use serde_json::json;

use crate::output::{format_or_json, OutputFormat};

pub fn handle(vault_root: &Path, name: &str, format: OutputFormat) -> Result<()> {
    let store = MemoryStore::new(VaultPaths::new(vault_root));
    let memory = store.read_hot(name)?;
    let obj = json!({
        "agent": name,
        "token_count": memory.token_count(),
        "entries": memory.entries().len(),
        "markdown": memory.to_markdown()?,
    });
    format_or_json(format, &obj, || print!("{}", render(&memory)))
}

pub(crate) fn render(memory: &HotMemory) -> String {
    if memory.entries().is_empty() && memory.persistent_notes().trim().is_empty() {
        return format!("No memory recorded for {}\n", memory.agent_name());
    }
    memory.to_markdown().unwrap_or_else(|e| format!("unreadable memory: {e}\n"))
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
