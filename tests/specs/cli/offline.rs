// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Commands run with no daemon listening.

use crate::prelude::*;

#[test]
fn status_without_daemon_exits_one() {
    let temp = Project::empty();
    temp.cx().args(&["status"]).fails().code_is(1).stderr_has("daemon not running");
}

#[test]
fn pause_without_daemon_exits_one() {
    let temp = Project::empty();
    temp.cx().args(&["pause", "digest"]).fails().code_is(1).stderr_has("daemon not running");
}

#[test]
fn compact_requires_name_or_all() {
    let temp = Project::empty();
    temp.cx().args(&["compact"]).fails().stderr_has("agent name required");
}

#[test]
fn daemon_status_reports_not_running() {
    let temp = Project::empty();
    temp.cx().args(&["daemon", "status"]).passes().stdout_has("Daemon not running");
}

#[test]
fn daemon_stop_without_daemon_is_noop() {
    let temp = Project::empty();
    temp.cx().args(&["daemon", "stop"]).passes().stdout_has("Daemon not running");
}

#[test]
fn costs_read_the_ledger_directly() {
    let temp = Project::empty();
    temp.cx().args(&["costs"]).passes().stdout_has("No runs recorded");

    temp.file(
        "costs.md",
        "| Timestamp | Agent | Mode | Categories | Cost | Input | Output | Duration |\n\
         |---|---|---|---|---|---|---|---|\n\
         | 2026-03-01T09:00:00 | digest | scheduled | news | $0.2500 | 10 | 20 | 1.5s |\n",
    );
    temp.cx()
        .args(&["costs", "--by", "category"])
        .passes()
        .stdout_has("news")
        .stdout_has("Total: $0.2500 over 1 runs");
}

#[test]
fn memory_for_unknown_agent_is_empty() {
    let temp = Project::empty();
    temp.cx().args(&["memory", "digest"]).passes().stdout_has("No memory recorded for digest");
}

const INBOX: &str = "---
name: inbox
execution:
  mode: watcher
  watcher:
    script: inbox.sh
    trigger_condition: \"count > 1\"
---
Triage mail.
";

#[test]
fn list_reads_definitions_without_daemon() {
    let temp = Project::empty();
    temp.file("agents/inbox.md", INBOX);
    temp.cx()
        .args(&["list", "--mode", "watcher"])
        .passes()
        .stdout_has("NAME")
        .stdout_has("inbox")
        .stdout_has("every 300s");
    temp.cx().args(&["list", "--mode", "scheduled"]).passes().stdout_has("No agents found");
}

#[test]
fn logs_show_newest_run_body() {
    let temp = Project::empty();
    temp.file("runs/2026-03-01/inbox-090000.md", "---\nagent: inbox\n---\n\nold run\n");
    temp.file("runs/2026-03-02/inbox-090000.md", "---\nagent: inbox\n---\n\nnew run\n");
    let out = temp.cx().args(&["logs", "inbox", "--last", "1"]).passes();
    assert!(out.stdout().contains("== 2026-03-02 090000 =="), "{out}");
    assert!(out.stdout().contains("new run"), "{out}");
    assert!(!out.stdout().contains("old run"), "{out}");
}

#[test]
fn test_watcher_runs_script_once() {
    let temp = Project::empty();
    temp.file("agents/inbox.md", INBOX);
    temp.file("watchers/inbox.sh", "echo '{\"triggered\": true, \"context\": {\"count\": 0}}'\n");
    temp.cx()
        .args(&["test-watcher", "inbox"])
        .passes()
        .stdout_has("triggered: true")
        .stdout_has("would NOT be triggered");
}
