// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use cx_adapters::FakeBackend;
use cx_core::{EntryKind, FakeClock, MemoryEntry, RunResult};
use cx_storage::VaultPaths;
use tempfile::TempDir;

use super::*;

struct Fixture {
    _dir: TempDir,
    memory: MemoryStore,
    backend: FakeBackend,
    clock: FakeClock,
    compactor: Compactor<FakeBackend, FakeClock>,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let memory = MemoryStore::new(VaultPaths::new(dir.path()));
    let backend = FakeBackend::new();
    let clock = FakeClock::new();
    let compactor = Compactor::new(backend.clone(), memory.clone(), "haiku", clock.clone());
    Fixture { _dir: dir, memory, backend, clock, compactor }
}

fn push(f: &Fixture, agent: &str, content: &str) {
    f.memory.append(agent, MemoryEntry::new(EntryKind::RunResult, content, f.clock.now())).unwrap();
    f.clock.advance(Duration::from_secs(60));
}

#[tokio::test]
async fn fewer_than_two_entries_is_a_noop() {
    let f = fixture();
    assert_eq!(f.compactor.compact("a").await.unwrap(), CompactionOutcome::Skipped);
    push(&f, "a", "only");
    assert_eq!(f.compactor.compact("a").await.unwrap(), CompactionOutcome::Skipped);
    assert!(f.backend.calls().is_empty());
    assert!(f.memory.list_archives("a").unwrap().is_empty());
}

#[tokio::test]
async fn compaction_keeps_summary_and_newest_entry() {
    let f = fixture();
    push(&f, "a", "one");
    push(&f, "a", "two");
    push(&f, "a", "three");
    f.backend.push(FakeBackend::success("one and two happened", None));

    let outcome = f.compactor.compact("a").await.unwrap();
    let CompactionOutcome::Compacted { archive } = outcome else {
        panic!("expected compaction, got {outcome:?}");
    };

    let hot = f.memory.read_hot("a").unwrap();
    let kinds: Vec<_> = hot.entries().iter().map(|e| e.kind).collect();
    assert_eq!(kinds, [EntryKind::Compaction, EntryKind::RunResult]);
    assert_eq!(hot.entries()[0].content, "one and two happened");
    assert_eq!(hot.entries()[1].content, "three");
    assert!(hot.last_compacted().is_some());

    assert_eq!(f.memory.list_archives("a").unwrap(), [archive.clone()]);
    let text = f.memory.read_archive("a", &archive).unwrap();
    assert!(text.contains("one and two happened"));
    assert!(text.contains("one") && text.contains("two"));
    assert!(!text.contains("three"));

    let calls = f.backend.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].model.as_deref(), Some("haiku"));
    assert_eq!(calls[0].max_budget_usd, Some(COMPACTION_BUDGET_USD));
    assert!(calls[0].prompt.contains("[run_result]\none"));
    assert!(!calls[0].prompt.contains("three"));
}

#[tokio::test]
async fn summarizer_error_leaves_memory_untouched() {
    let f = fixture();
    push(&f, "a", "one");
    push(&f, "a", "two");
    let before = f.memory.read_hot("a").unwrap();
    f.backend.push(RunResult::failure("rate limited", 5));

    let err = f.compactor.compact("a").await.unwrap_err();
    assert!(matches!(err, CompactionError::Summarizer(ref m) if m == "rate limited"));
    assert_eq!(f.memory.read_hot("a").unwrap(), before);
    assert!(f.memory.list_archives("a").unwrap().is_empty());
}

#[tokio::test]
async fn compact_if_needed_honours_threshold() {
    let f = fixture();
    push(&f, "a", &"word ".repeat(50));
    push(&f, "a", "latest");

    let mut def = AgentDefinition::scheduled("a", "* * * * *");
    assert!(!f.compactor.should_compact(&def).unwrap());
    assert_eq!(f.compactor.compact_if_needed(&def).await.unwrap(), CompactionOutcome::Skipped);

    def.memory.max_current_tokens = Some(10);
    assert!(f.compactor.should_compact(&def).unwrap());
    assert!(matches!(
        f.compactor.compact_if_needed(&def).await.unwrap(),
        CompactionOutcome::Compacted { .. }
    ));
}
