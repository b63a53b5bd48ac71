// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test fixtures for listener tests.

use cx_adapters::{FakeBackend, ProcessRegistry};
use cx_core::{
    frontmatter, AgentDefinition, Clock, DaemonState, EntryKind, FakeClock, MemoryEntry,
};
use cx_storage::VaultPaths;
use tempfile::TempDir;

use super::ListenCtx;
use crate::memory::Compactor;
use crate::shared::SharedState;
use crate::vault::Vault;

pub(crate) struct TestCtx {
    pub _dir: TempDir,
    pub backend: FakeBackend,
    pub clock: FakeClock,
    pub ctx: ListenCtx<FakeBackend, FakeClock>,
}

pub(crate) fn test_ctx() -> TestCtx {
    let dir = TempDir::new().unwrap();
    let vault = Vault::new(VaultPaths::new(dir.path()));
    std::fs::create_dir_all(vault.paths.agents_dir()).unwrap();
    let backend = FakeBackend::new();
    let clock = FakeClock::new();
    let ctx = ListenCtx {
        state: SharedState::new(DaemonState::new(7, clock.now())),
        registry: ProcessRegistry::new(),
        compactor: Compactor::new(backend.clone(), vault.memory.clone(), "haiku", clock.clone()),
        vault,
    };
    TestCtx { _dir: dir, backend, clock, ctx }
}

impl TestCtx {
    pub fn write_agent(&self, def: &AgentDefinition) {
        let raw = frontmatter::render(def, &def.body).unwrap();
        std::fs::write(self.ctx.vault.paths.agent_file(&def.name), raw).unwrap();
    }

    /// Append `n` entries of `words` words each to the agent's hot memory.
    pub fn fill_memory(&self, agent: &str, n: usize, words: usize) {
        let content = vec!["word"; words].join(" ");
        for _ in 0..n {
            let entry = MemoryEntry::new(EntryKind::RunResult, &content, self.clock.now());
            self.ctx.vault.memory.append(agent, entry).unwrap();
        }
    }
}
