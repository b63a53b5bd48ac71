// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{TimeZone, Utc};
use cx_core::{EntryKind, MemoryEntry};
use tempfile::TempDir;

use super::*;

#[test]
fn empty_memory_says_so() {
    assert_eq!(render(&HotMemory::empty("digest")), "No memory recorded for digest\n");
}

#[test]
fn recorded_memory_prints_markdown() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new(VaultPaths::new(dir.path()));
    let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    let memory =
        store.append("digest", MemoryEntry::new(EntryKind::Note, "remember the milk", at)).unwrap();

    let out = render(&memory);
    assert_eq!(out, memory.to_markdown().unwrap());
    assert!(out.contains("remember the milk"));
}

#[test]
fn handle_reads_from_vault() {
    let dir = TempDir::new().unwrap();
    assert!(handle(dir.path(), "nobody", OutputFormat::Json).is_ok());
}
