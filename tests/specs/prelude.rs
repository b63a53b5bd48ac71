// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness: an isolated state dir, vault and config per test.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use assert_cmd::Command;
use tempfile::TempDir;

/// Upper bound for polling daemon-side effects
pub const SPEC_WAIT_MAX_MS: u64 = 10_000;

/// A watcher whose script never triggers, so no backend is ever invoked.
pub const IDLE_AGENT: &str = "---
name: digest
execution:
  mode: watcher
  watcher:
    script: quiet.sh
    poll_interval_seconds: 3600
---

Summarize the news.
";

pub const QUIET_SCRIPT: &str = "echo '{\"triggered\": false}'\n";

/// `cx` with no daemon-related environment.
pub fn cli() -> CliBuilder {
    CliBuilder { cmd: Command::cargo_bin("cx").unwrap() }
}

/// Poll `check` until it holds or `max_ms` elapses.
pub fn wait_for(max_ms: u64, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(max_ms);
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    check()
}

pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn empty() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("state")).unwrap();
        std::fs::create_dir_all(dir.path().join("vault/cx/agents")).unwrap();
        let config = format!(
            "cx_path = \"{}\"\nclaude_path = \"/nonexistent/claude\"\n",
            dir.path().join("vault").display()
        );
        std::fs::write(dir.path().join("config.toml"), config).unwrap();
        Self { dir }
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.path().join("state")
    }

    pub fn vault_path(&self) -> PathBuf {
        self.dir.path().join("vault/cx")
    }

    /// Write `contents` to `rel` under the vault's `cx/` directory.
    pub fn file(&self, rel: &str, contents: &str) {
        let path = self.vault_path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    pub fn cx(&self) -> CliBuilder {
        let mut cmd = Command::cargo_bin("cx").unwrap();
        cmd.env("CX_STATE_DIR", self.state_path())
            .env("CX_CONFIG", self.dir.path().join("config.toml"))
            .env("CX_DAEMON_BINARY", assert_cmd::cargo::cargo_bin("cxd"))
            .env("CX_TICK_INTERVAL_MS", "100")
            .env("NO_COLOR", "1");
        CliBuilder { cmd }
    }

    pub fn daemon_log(&self) -> String {
        std::fs::read_to_string(self.state_path().join("daemon.log")).unwrap_or_default()
    }
}

impl Drop for Project {
    fn drop(&mut self) {
        if self.state_path().join("daemon.pid").exists() {
            let _ = self.cx().cmd.args(["daemon", "stop"]).output();
        }
    }
}

pub struct CliBuilder {
    cmd: Command,
}

impl CliBuilder {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn passes(mut self) -> RunResult {
        let output = self.cmd.output().unwrap();
        let result = RunResult::from(output);
        assert!(result.code == Some(0), "expected success, got {:?}\n{}", result.code, result);
        result
    }

    pub fn fails(mut self) -> RunResult {
        let output = self.cmd.output().unwrap();
        let result = RunResult::from(output);
        assert!(result.code != Some(0), "expected failure, got success\n{}", result);
        result
    }
}

pub struct RunResult {
    pub code: Option<i32>,
    stdout: String,
    stderr: String,
}

impl From<std::process::Output> for RunResult {
    fn from(output: std::process::Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

impl std::fmt::Display for RunResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "--- stdout ---\n{}\n--- stderr ---\n{}", self.stdout, self.stderr)
    }
}

impl RunResult {
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(self.stdout.contains(needle), "stdout missing {needle:?}\n{self}");
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(self.stderr.contains(needle), "stderr missing {needle:?}\n{self}");
        self
    }

    pub fn code_is(self, code: i32) -> Self {
        assert_eq!(self.code, Some(code), "{self}");
        self
    }
}
