// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle specs
//!
//! Start the real `cxd`, drive it over the socket, stop it.

use crate::prelude::*;

#[test]
fn daemon_start_reports_success() {
    let temp = Project::empty();
    temp.cx().args(&["daemon", "start"]).passes().stdout_has("Daemon started");
    temp.cx().args(&["daemon", "status"]).passes().stdout_has("Status: running");
}

#[test]
fn daemon_start_twice_is_noop() {
    let temp = Project::empty();
    temp.cx().args(&["daemon", "start"]).passes();
    temp.cx().args(&["daemon", "start"]).passes().stdout_has("Daemon already running");
}

#[test]
fn daemon_creates_pid_and_log_files() {
    let temp = Project::empty();
    temp.cx().args(&["daemon", "start"]).passes();

    let pid = std::fs::read_to_string(temp.state_path().join("daemon.pid")).unwrap();
    assert!(pid.trim().parse::<u32>().is_ok());
    assert!(temp.daemon_log().contains("--- cxd: starting"));
}

#[test]
fn status_lists_agents_from_the_vault() {
    let temp = Project::empty();
    temp.file("agents/digest.md", IDLE_AGENT);
    temp.file("watchers/quiet.sh", QUIET_SCRIPT);
    temp.cx().args(&["daemon", "start"]).passes();

    let listed = wait_for(SPEC_WAIT_MAX_MS, || {
        temp.cx().args(&["status"]).passes().stdout().contains("digest")
    });
    if !listed {
        eprintln!("=== DAEMON LOG ===\n{}\n=== END LOG ===", temp.daemon_log());
    }
    assert!(listed, "agent should appear after the first tick");
    temp.cx().args(&["status"]).passes().stdout_has("watcher").stdout_has("active");
}

#[test]
fn pause_and_resume_round_trip() {
    let temp = Project::empty();
    temp.file("agents/digest.md", IDLE_AGENT);
    temp.file("watchers/quiet.sh", QUIET_SCRIPT);
    temp.cx().args(&["daemon", "start"]).passes();

    temp.cx().args(&["pause", "digest"]).passes().stdout_has("Agent digest paused");
    temp.cx().args(&["status"]).passes().stdout_has("paused");
    temp.cx().args(&["resume", "digest"]).passes().stdout_has("Agent digest resumed");

    // The definition file is never rewritten by an override
    let raw = std::fs::read_to_string(temp.vault_path().join("agents/digest.md")).unwrap();
    assert_eq!(raw, IDLE_AGENT);
}

#[test]
fn compact_unknown_agent_fails() {
    let temp = Project::empty();
    temp.cx().args(&["daemon", "start"]).passes();
    temp.cx().args(&["compact", "ghost"]).fails().stderr_has("Unknown agent: ghost");
}

#[test]
fn daemon_stop_removes_socket_and_saves_state() {
    let temp = Project::empty();
    temp.cx().args(&["daemon", "start"]).passes();
    temp.cx().args(&["daemon", "stop"]).passes().stdout_has("Daemon stopped");

    assert!(!temp.state_path().join("daemon.sock").exists());
    assert!(!temp.state_path().join("daemon.pid").exists());
    assert!(temp.state_path().join("daemon-state.json").exists());
    temp.cx().args(&["daemon", "status"]).passes().stdout_has("Daemon not running");
}
