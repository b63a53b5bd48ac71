// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI help output specs

use crate::prelude::*;

#[test]
fn cx_help_shows_usage() {
    cli().args(&["--help"]).passes().stdout_has("Usage:");
}

#[test]
fn cx_help_lists_agent_commands() {
    cli()
        .args(&["--help"])
        .passes()
        .stdout_has("status")
        .stdout_has("pause")
        .stdout_has("compact")
        .stdout_has("costs")
        .stdout_has("memory")
        .stdout_has("list")
        .stdout_has("logs")
        .stdout_has("test-watcher");
}

#[test]
fn cx_daemon_help_shows_subcommands() {
    cli()
        .args(&["daemon", "--help"])
        .passes()
        .stdout_has("start")
        .stdout_has("stop")
        .stdout_has("status");
}

#[test]
fn cx_version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has(env!("CARGO_PKG_VERSION"));
}

#[test]
fn cx_without_command_fails_with_usage() {
    cli().fails().code_is(2).stderr_has("Usage:");
}
