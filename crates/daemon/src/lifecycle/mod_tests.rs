// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use cx_core::AgentStatus;
use cx_storage::StateStore;
use tempfile::tempdir;

use super::*;

#[test]
fn config_paths_live_in_state_dir() {
    let config = Config::in_dir("/tmp/cx-state");
    assert_eq!(config.socket_path, Path::new("/tmp/cx-state/daemon.sock"));
    assert_eq!(config.lock_path, Path::new("/tmp/cx-state/daemon.pid"));
    assert_eq!(config.log_path, Path::new("/tmp/cx-state/daemon.log"));
    assert_eq!(config.state_path, Path::new("/tmp/cx-state/daemon-state.json"));
}

#[tokio::test]
async fn shutdown_saves_state_and_removes_files() {
    let dir = tempdir().unwrap();
    let config = Config::in_dir(dir.path());
    let StartupResult { mut daemon, listener } = startup(&config).await.unwrap();
    drop(listener);
    daemon.state.with_agent("digest", |a| a.override_status(AgentStatus::Paused));

    daemon.shutdown().await;

    assert!(!config.socket_path.exists());
    assert!(!config.lock_path.exists());
    assert!(daemon.kill.is_cancelled());
    let saved = StateStore::new(&config.state_path).load().unwrap().unwrap();
    assert_eq!(saved.agent("digest").unwrap().status, AgentStatus::Paused);

    // Second call is a no-op
    std::fs::remove_file(&config.state_path).unwrap();
    daemon.shutdown().await;
    assert!(!config.state_path.exists());
}

#[tokio::test]
async fn shutdown_stops_spawned_services() {
    let dir = tempdir().unwrap();
    let config = Config::in_dir(dir.path().join("state"));
    let agents_dir = dir.path().join("vault/cx/agents");
    let StartupResult { mut daemon, listener } = startup(&config).await.unwrap();

    let ctx = crate::listener::test_fixtures::test_ctx();
    daemon.spawn_listener(listener, Arc::new(ctx.ctx));
    daemon.watch_definitions(&agents_dir).unwrap();
    assert!(agents_dir.is_dir());

    tokio::time::timeout(std::time::Duration::from_secs(10), daemon.shutdown()).await.unwrap();
    assert!(!config.socket_path.exists());
}
