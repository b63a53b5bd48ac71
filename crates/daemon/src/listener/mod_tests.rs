// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use serde_json::{json, Value as Json};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use super::test_fixtures::test_ctx;
use super::*;

/// Send `line` through `handle_connection` and parse the reply line.
async fn exchange(ctx: &ListenCtx<cx_adapters::FakeBackend, cx_core::FakeClock>, line: &str) -> Json {
    let input = format!("{line}\n");
    let mut output = Vec::new();
    handle_connection(input.as_bytes(), &mut output, ctx).await.unwrap();
    assert_eq!(output.iter().filter(|b| **b == b'\n').count(), 1);
    serde_json::from_slice(&output).unwrap()
}

#[tokio::test]
async fn malformed_json_gets_error_with_empty_id() {
    let t = test_ctx();
    let reply = exchange(&t.ctx, "{nope").await;
    assert_eq!(reply, json!({ "id": "", "error": "Invalid JSON" }));
}

#[tokio::test]
async fn unknown_method_echoes_id() {
    let t = test_ctx();
    let reply = exchange(&t.ctx, r#"{"id":"r1","method":"explode"}"#).await;
    assert_eq!(reply["id"], "r1");
    assert_eq!(reply["error"], "Unknown method: explode");
}

#[tokio::test]
async fn missing_name_is_an_error() {
    let t = test_ctx();
    let reply = exchange(&t.ctx, r#"{"id":"r2","method":"pause","params":{}}"#).await;
    assert_eq!(reply["id"], "r2");
    assert!(reply["error"].as_str().unwrap().contains("name"));
}

#[tokio::test]
async fn start_then_status_reflects_new_agent() {
    let t = test_ctx();
    let reply = exchange(&t.ctx, r#"{"id":"a","method":"start","params":{"name":"fresh"}}"#).await;
    assert_eq!(reply, json!({ "id": "a", "result": { "message": "Agent fresh will run on next tick" } }));

    let status = exchange(&t.ctx, r#"{"id":"b","method":"status"}"#).await;
    assert_eq!(status["id"], "b");
    assert_eq!(status["result"]["pid"], 7);
    let fresh = &status["result"]["agents"]["fresh"];
    assert_eq!(fresh["running"], false);
    assert_eq!(fresh["status"], "active");
}

#[tokio::test]
async fn empty_connection_is_closed_without_reply() {
    let t = test_ctx();
    let mut output = Vec::new();
    let err = handle_connection(&b""[..], &mut output, &t.ctx).await.unwrap_err();
    assert!(matches!(err, ConnectionError::Protocol(protocol::ProtocolError::ConnectionClosed)));
    assert!(output.is_empty());
}

#[tokio::test]
async fn listener_serves_unix_socket_until_shutdown() {
    let dir = TempDir::new().unwrap();
    let socket = dir.path().join("daemon.sock");
    let t = test_ctx();
    let ctx = Arc::new(t.ctx);
    let listener = Listener::new(UnixListener::bind(&socket).unwrap(), Arc::clone(&ctx));
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(listener.run(shutdown.clone()));

    let mut stream = UnixStream::connect(&socket).await.unwrap();
    stream.write_all(b"{\"id\":\"x\",\"method\":\"pause\",\"params\":{\"name\":\"w\"}}\n").await.unwrap();
    let mut line = String::new();
    BufReader::new(stream).read_line(&mut line).await.unwrap();
    let reply: Json = serde_json::from_str(&line).unwrap();
    assert_eq!(reply["result"]["message"], "Agent w paused");
    assert_eq!(ctx.state.agent("w").unwrap().status, cx_core::AgentStatus::Paused);

    shutdown.cancel();
    task.await.unwrap();
}
