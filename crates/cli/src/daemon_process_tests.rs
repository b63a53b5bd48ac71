// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tempfile::TempDir;

use super::*;

#[test]
fn parse_startup_error_reads_error_line() {
    let log = "\
--- cxd: starting (pid: 12345) ---

2026-01-01T00:00:00Z ERROR cxd: Failed to start daemon: Failed to acquire lock: daemon already running?
";
    let err = parse_startup_error(log).unwrap();
    assert_eq!(err, "Failed to acquire lock: daemon already running?");
}

#[test]
fn parse_startup_error_no_error() {
    let log = "\
--- cxd: starting (pid: 12345) ---

2026-01-01T00:00:00Z  INFO cxd: Daemon started
";
    assert!(parse_startup_error(log).is_none());
}

#[test]
fn parse_startup_error_multiple_startups_picks_last() {
    let log = "\
--- cxd: starting (pid: 100) ---
ERROR Failed to start daemon: first failure
--- cxd: starting (pid: 200) ---
ERROR Failed to start daemon: second failure
";
    assert_eq!(parse_startup_error(log).unwrap(), "second failure");
}

#[test]
fn parse_startup_error_ignores_errors_before_last_start() {
    let log = "\
--- cxd: starting (pid: 100) ---
ERROR Failed to start daemon: old failure
--- cxd: starting (pid: 200) ---
INFO Daemon ready
";
    assert!(parse_startup_error(log).is_none());
}

#[test]
fn parse_startup_error_no_marker() {
    assert!(parse_startup_error("some random log content\n").is_none());
}

#[test]
fn stop_without_pid_file_reports_not_running() {
    let dir = TempDir::new().unwrap();
    assert!(!stop(dir.path()).unwrap());
}

#[test]
fn stop_with_garbage_pid_file_reports_not_running() {
    let dir = TempDir::new().unwrap();
    std::fs::write(env::pid_path(dir.path()), "not a pid\n").unwrap();
    assert!(!stop(dir.path()).unwrap());
}

#[test]
fn stop_terminates_process_from_pid_file() {
    let dir = TempDir::new().unwrap();
    let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
    std::fs::write(env::pid_path(dir.path()), format!("{}\n", child.id())).unwrap();

    // Reap in the background so the pid disappears once it exits
    let waiter = std::thread::spawn(move || child.wait());
    assert!(stop(dir.path()).unwrap());
    assert!(!waiter.join().unwrap().unwrap().success());
}
