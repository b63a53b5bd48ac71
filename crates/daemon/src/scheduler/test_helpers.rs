// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler fixture: a temp vault, fake adapters and a fake clock.

use std::time::Duration;

use cx_adapters::{FakeBackend, FakeNotifyAdapter, FakeScriptRunner, ProcessRegistry};
use cx_core::{frontmatter, AgentDefinition, Clock, DaemonAgentState, DaemonState, FakeClock};
use cx_storage::{StateStore, VaultPaths};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use super::{Scheduler, SchedulerConfig, SchedulerCtx, SchedulerDeps};
use crate::shared::SharedState;
use crate::vault::Vault;

pub(crate) type TestScheduler =
    Scheduler<FakeBackend, FakeScriptRunner, FakeNotifyAdapter, FakeClock>;

pub(crate) struct Fixture {
    pub dir: TempDir,
    pub backend: FakeBackend,
    pub scripts: FakeScriptRunner,
    pub notifier: FakeNotifyAdapter,
    pub clock: FakeClock,
    pub state: SharedState,
    pub registry: ProcessRegistry,
    pub vault: Vault,
    pub scheduler: TestScheduler,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let paths = VaultPaths::new(dir.path().join("vault"));
        std::fs::create_dir_all(paths.agents_dir()).unwrap();

        let backend = FakeBackend::new();
        let scripts = FakeScriptRunner::new();
        let notifier = FakeNotifyAdapter::new();
        let clock = FakeClock::new();
        let state = SharedState::new(DaemonState::new(1, clock.now()));
        let registry = ProcessRegistry::new();
        let vault = Vault::new(paths);

        let scheduler = Scheduler::new(
            SchedulerDeps {
                backend: backend.clone(),
                scripts: scripts.clone(),
                notifier: notifier.clone(),
            },
            SchedulerCtx {
                state: state.clone(),
                registry: registry.clone(),
                vault: vault.clone(),
                store: StateStore::new(dir.path().join("state/daemon-state.json")),
            },
            SchedulerConfig {
                default_model: "sonnet".to_string(),
                compaction_model: "haiku".to_string(),
                tick_interval: Duration::from_secs(30),
            },
            clock.clone(),
        );

        Self { dir, backend, scripts, notifier, clock, state, registry, vault, scheduler }
    }

    /// Write `def` to the vault's agents directory.
    pub fn write_agent(&self, def: &AgentDefinition) {
        let raw = frontmatter::render(def, &def.body).unwrap();
        std::fs::write(self.vault.paths.agent_file(&def.name), raw).unwrap();
    }

    pub async fn tick(&self) -> usize {
        self.scheduler.tick(&CancellationToken::new()).await
    }

    pub fn agent(&self, name: &str) -> DaemonAgentState {
        self.state.agent(name).unwrap()
    }

    pub fn advance(&self, secs: u64) {
        self.clock.advance(Duration::from_secs(secs));
    }

    pub fn state_file(&self) -> std::path::PathBuf {
        self.dir.path().join("state/daemon-state.json")
    }
}
