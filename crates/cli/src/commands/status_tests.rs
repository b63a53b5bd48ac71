// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{Duration, TimeZone};
use cx_core::AgentMode;
use serial_test::serial;

use super::*;

fn setup_no_color() {
    std::env::set_var("NO_COLOR", "1");
    std::env::remove_var("COLOR");
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

#[test]
#[serial]
fn empty_daemon_says_no_agents() {
    setup_no_color();
    let state = DaemonState::new(42, now() - Duration::hours(2));
    assert_eq!(render(&state, now()), "Daemon: running (pid 42, up 2h)\nNo agents");
}

#[test]
#[serial]
fn agents_render_as_table() {
    setup_no_color();
    let mut state = DaemonState::new(42, now() - Duration::seconds(30));
    let digest = state.ensure_agent("digest");
    digest.mode = Some(AgentMode::Scheduled);
    digest.last_run = Some(now() - Duration::minutes(5));
    let mail = state.ensure_agent("mail");
    mail.mode = Some(AgentMode::Watcher);
    mail.status = AgentStatus::Paused;
    mail.consecutive_failures = 3;
    let helper = state.ensure_agent("helper");
    helper.running = true;

    let out = render(&state, now());
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[0], "Daemon: running (pid 42, up 30s)");
    assert!(lines[2].starts_with("AGENT"));
    assert!(lines[3].starts_with("digest  scheduled  active"));
    assert!(lines[3].contains("5m ago"));
    assert!(lines[4].starts_with("helper  -"));
    assert!(lines[4].contains("active (running)"));
    assert!(lines[5].contains("paused"));
    assert!(lines[5].contains(" 3 "));
}
