// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn sh(script: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(script);
    cmd
}

#[tokio::test]
async fn captures_output_and_deregisters() {
    let supervision = Supervision::default();
    let output = run_with_timeout(
        sh("echo out; echo err >&2; exit 3"),
        "a",
        Duration::from_secs(5),
        &supervision,
        "test",
    )
    .await
    .unwrap();

    assert_eq!(String::from_utf8_lossy(&output.stdout), "out\n");
    assert_eq!(String::from_utf8_lossy(&output.stderr), "err\n");
    assert_eq!(output.status.code(), Some(3));
    assert!(supervision.registry.is_empty());
}

#[tokio::test]
async fn registered_while_running() {
    let supervision = Supervision::default();
    let registry = supervision.registry.clone();
    let task = tokio::spawn(async move {
        run_with_timeout(sh("exec sleep 5"), "slow", Duration::from_secs(10), &supervision, "test")
            .await
    });

    let mut seen = false;
    for _ in 0..100 {
        if registry.is_running("slow") {
            seen = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(seen);

    registry.terminate_all(Duration::from_secs(2)).await;
    let err = task.await.unwrap().unwrap_err();
    assert!(matches!(err, ProcessError::Cancelled { .. }));
    assert!(registry.is_empty());
}

async fn wait_registered(registry: &ProcessRegistry, name: &str) {
    for _ in 0..200 {
        if registry.is_running(name) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{name} never registered");
}

#[tokio::test]
async fn terminate_all_reaches_grandchildren() {
    let supervision = Supervision::default();
    let registry = supervision.registry.clone();
    // sh stays the parent of sleep, which holds the stdout pipe open
    let task = tokio::spawn(async move {
        let cmd = sh("sleep 30; echo done");
        run_with_timeout(cmd, "nested", Duration::from_secs(60), &supervision, "test").await
    });
    wait_registered(&registry, "nested").await;

    registry.terminate_all(Duration::from_secs(2)).await;
    let result = tokio::time::timeout(Duration::from_secs(10), task).await;
    let err = result.expect("run outlived shutdown").unwrap().unwrap_err();
    assert!(matches!(err, ProcessError::Cancelled { .. }));
}

#[tokio::test]
async fn nothing_spawns_while_draining() {
    let supervision = Supervision::default();
    supervision.registry.terminate_all(Duration::ZERO).await;

    let err = run_with_timeout(sh("exit 0"), "late", Duration::from_secs(5), &supervision, "x")
        .await
        .unwrap_err();
    assert!(matches!(err, ProcessError::Cancelled { .. }));
    assert!(supervision.registry.is_empty());
}

#[tokio::test]
async fn timeout_is_an_error() {
    let supervision = Supervision::default();
    let err = run_with_timeout(
        sh("sleep 5"),
        "a",
        Duration::from_millis(50),
        &supervision,
        "sleeper",
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ProcessError::Timeout { .. }));
    assert!(supervision.registry.is_empty());
}

#[tokio::test]
async fn cancellation_is_an_error() {
    let supervision = Supervision::default();
    supervision.cancel.cancel();
    let err = run_with_timeout(sh("sleep 5"), "a", Duration::from_secs(5), &supervision, "x")
        .await
        .unwrap_err();
    assert!(matches!(err, ProcessError::Cancelled { .. }));
}

#[tokio::test]
async fn missing_program_is_spawn_error() {
    let err = run_with_timeout(
        Command::new("/nonexistent/cx-test-binary"),
        "a",
        Duration::from_secs(1),
        &Supervision::default(),
        "missing",
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ProcessError::Spawn { .. }));
}
