// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use tempfile::TempDir;
use yare::parameterized;

use super::*;
use crate::exit_error::ExitError;

#[parameterized(
    start = { Action::Start, "start" },
    stop = { Action::Stop, "stop" },
    pause = { Action::Pause, "pause" },
    resume = { Action::Resume, "resume" },
)]
fn action_maps_to_method(action: Action, method: &str) {
    let request = action.request("digest".into());
    assert_eq!(request.method(), method);
    let raw = request.to_raw("1");
    assert_eq!(raw.params, Some(json!({ "name": "digest" })));
}

#[tokio::test]
async fn no_daemon_is_exit_error() {
    let dir = TempDir::new().unwrap();
    let client = DaemonClient::new(dir.path().join("daemon.sock"), Duration::from_secs(1));

    let err = handle(&client, Action::Pause, "digest".into(), OutputFormat::Text)
        .await
        .unwrap_err();
    let exit = err.downcast_ref::<ExitError>().unwrap();
    assert_eq!(exit.code, 1);
    assert_eq!(exit.message, "daemon not running");
}
