// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use cx_adapters::FakeBackend;
use cx_core::{AgentDefinition, RunResult};
use serde_json::json;

use super::super::test_fixtures::{test_ctx, TestCtx};
use super::*;

fn agent(t: &TestCtx, name: &str, threshold: u64) {
    let mut def = AgentDefinition::scheduled(name, "0 9 * * *");
    def.memory.max_current_tokens = Some(threshold);
    t.write_agent(&def);
}

#[tokio::test]
async fn compacts_named_agent() {
    let t = test_ctx();
    agent(&t, "digest", 4000);
    t.fill_memory("digest", 3, 5);
    t.backend.push(FakeBackend::success("summary", None));

    let reply = handle_compact(&t.ctx, CompactTarget::Agent("digest".into())).await;

    assert_eq!(reply, Reply::Ok(json!({ "compacted": ["digest"] })));
    assert_eq!(t.ctx.vault.memory.read_hot("digest").unwrap().entries().len(), 2);
    assert_eq!(t.ctx.vault.memory.list_archives("digest").unwrap().len(), 1);
    assert!(!t.ctx.state.agent("digest").unwrap().running);
}

#[tokio::test]
async fn single_entry_is_reported_as_nothing_compacted() {
    let t = test_ctx();
    agent(&t, "digest", 4000);
    t.fill_memory("digest", 1, 5);

    let reply = handle_compact(&t.ctx, CompactTarget::Agent("digest".into())).await;

    assert_eq!(reply, Reply::Ok(json!({ "compacted": [] })));
    assert!(t.backend.calls().is_empty());
}

#[tokio::test]
async fn unknown_agent_is_an_error() {
    let t = test_ctx();
    let reply = handle_compact(&t.ctx, CompactTarget::Agent("ghost".into())).await;
    assert_eq!(reply, Reply::Error("Unknown agent: ghost".to_string()));
    assert!(t.ctx.state.agent("ghost").is_none());
}

#[tokio::test]
async fn running_agent_is_refused() {
    let t = test_ctx();
    agent(&t, "digest", 4000);
    t.fill_memory("digest", 3, 5);
    let _running = t.ctx.state.try_begin_run("digest").unwrap();

    let reply = handle_compact(&t.ctx, CompactTarget::Agent("digest".into())).await;

    assert!(matches!(reply, Reply::Error(ref m) if m.contains("is running")));
    assert!(t.backend.calls().is_empty());
}

#[tokio::test]
async fn agent_with_live_process_is_refused() {
    let t = test_ctx();
    agent(&t, "digest", 4000);
    let _guard = t.ctx.registry.register("digest", 999);

    let reply = handle_compact(&t.ctx, CompactTarget::Agent("digest".into())).await;

    assert!(matches!(reply, Reply::Error(_)));
}

#[tokio::test]
async fn summarizer_failure_is_reported() {
    let t = test_ctx();
    agent(&t, "digest", 4000);
    t.fill_memory("digest", 3, 5);
    t.backend.push(RunResult::failure("rate limited", 5));

    let reply = handle_compact(&t.ctx, CompactTarget::Agent("digest".into())).await;

    assert!(matches!(reply, Reply::Error(ref m) if m.contains("rate limited")));
    assert_eq!(t.ctx.vault.memory.read_hot("digest").unwrap().entries().len(), 3);
}

#[tokio::test]
async fn all_compacts_only_agents_over_threshold() {
    let t = test_ctx();
    agent(&t, "big", 10);
    agent(&t, "small", 4000);
    let mut quiet = AgentDefinition::scheduled("nomem", "0 9 * * *");
    quiet.memory.enabled = Some(false);
    quiet.memory.max_current_tokens = Some(10);
    t.write_agent(&quiet);
    for name in ["big", "small", "nomem"] {
        t.fill_memory(name, 3, 20);
    }

    let reply = handle_compact(&t.ctx, CompactTarget::All).await;

    assert_eq!(reply, Reply::Ok(json!({ "compacted": ["big"] })));
    assert_eq!(t.backend.calls().len(), 1);
}
