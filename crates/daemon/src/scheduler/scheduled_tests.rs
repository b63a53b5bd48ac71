// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{TimeZone, Utc};
use cx_adapters::FakeBackend;
use cx_core::{AgentDefinition, EntryKind, NotificationEvent, RunResult};

use crate::scheduler::test_helpers::Fixture;
use super::*;

#[tokio::test]
async fn first_check_is_due_and_runs_with_context() {
    let f = Fixture::new();
    let mut def = AgentDefinition::scheduled("digest", "0 0 1 1 *").notify_all();
    def.body = "Summarize the news.".to_string();
    f.write_agent(&def);
    f.backend.push(FakeBackend::success("all quiet", None));

    f.tick().await;

    let calls = f.backend.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].agent, "digest");
    assert_eq!(calls[0].model.as_deref(), Some("sonnet"));
    assert_eq!(calls[0].timeout, SCHEDULED_RUN_TIMEOUT);
    assert!(calls[0].prompt.starts_with("Summarize the news."));

    let agent = f.agent("digest");
    let now = f.clock.now();
    assert_eq!(agent.last_run, Some(now));
    assert_eq!(agent.last_check, Some(now));
    assert_eq!(agent.next_run, Some(Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap()));
    assert!(!agent.running);

    let sent = f.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].event, NotificationEvent::Completion);
    assert!(sent[0].message.ends_with("all quiet"));
}

#[tokio::test]
async fn not_due_only_updates_next_run() {
    let f = Fixture::new();
    f.write_agent(&AgentDefinition::scheduled("yearly", "0 0 1 1 *"));
    f.tick().await;
    f.advance(60);
    f.tick().await;

    assert_eq!(f.backend.calls().len(), 1);
    let agent = f.agent("yearly");
    assert_eq!(agent.last_check, Some(f.clock.now()));
    assert_eq!(agent.next_run, Some(Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap()));
}

#[tokio::test]
async fn every_minute_fires_again_after_a_minute() {
    let f = Fixture::new();
    f.write_agent(&AgentDefinition::scheduled("pulse", "* * * * *"));
    f.tick().await;
    f.advance(30);
    f.tick().await;
    assert_eq!(f.backend.calls().len(), 1);
    f.advance(30);
    f.tick().await;
    assert_eq!(f.backend.calls().len(), 2);
}

#[tokio::test]
async fn run_is_logged_costed_and_remembered() {
    let f = Fixture::new();
    f.write_agent(&AgentDefinition::scheduled("digest", "* * * * *"));
    f.backend.push(FakeBackend::success("three headlines", None));

    f.tick().await;

    let memory = f.vault.memory.read_hot("digest").unwrap();
    assert_eq!(memory.entries().len(), 1);
    let entry = &memory.entries()[0];
    assert_eq!(entry.kind, EntryKind::RunResult);
    assert!(entry.content.contains("**Status**: SUCCESS"));
    assert!(entry.content.contains("three headlines"));

    let ledger = f.vault.ledger.read().unwrap();
    assert_eq!(ledger.len(), 1);
    let def = f.vault.definitions.read("digest").unwrap();
    assert_eq!(def.stats.total_runs, 1);
    assert_eq!(def.stats.last_status.as_deref(), Some("success"));
}

#[tokio::test]
async fn error_result_counts_failure_and_notifies() {
    let f = Fixture::new();
    f.write_agent(&AgentDefinition::scheduled("digest", "* * * * *").notify_all());
    f.backend.push(RunResult::failure("backend exploded", 10));

    f.tick().await;

    let agent = f.agent("digest");
    assert_eq!(agent.consecutive_failures, 1);
    assert_eq!(agent.last_run, None);
    let sent = f.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].event, NotificationEvent::Failure);
    assert_eq!(sent[0].message, "Run failed: backend exploded");
}

#[tokio::test]
async fn success_resets_failures() {
    let f = Fixture::new();
    f.write_agent(&AgentDefinition::scheduled("digest", "* * * * *"));
    f.state.with_agent("digest", |a| a.consecutive_failures = 2);

    f.tick().await;

    assert_eq!(f.agent("digest").consecutive_failures, 0);
}

#[tokio::test]
async fn model_and_budget_come_from_definition() {
    let f = Fixture::new();
    let mut def = AgentDefinition::scheduled("digest", "* * * * *");
    def.model = Some("opus".to_string());
    def.tools = vec!["Read".to_string()];
    def.resource_limits.max_cost_usd = Some(0.5);
    f.write_agent(&def);

    f.tick().await;

    let call = &f.backend.calls()[0];
    assert_eq!(call.model.as_deref(), Some("opus"));
    assert_eq!(call.tools, ["Read"]);
    assert_eq!(call.max_budget_usd, Some(0.5));
}
