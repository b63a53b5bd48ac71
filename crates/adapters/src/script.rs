// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watch scripts: short-lived checks that decide whether a watcher fires.
//!
//! A script reports on stdout with a JSON line
//! `{"triggered": bool, "context": {...}, "error": "..."}`; the last
//! non-empty line wins so scripts may log freely before it. Identity and
//! the last check time arrive in `CX_WATCHER_CONFIG`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tokio::process::Command;

use crate::subprocess::{run_with_timeout, ProcessError, Supervision};

pub const SCRIPT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptRequest {
    pub agent: String,
    pub script: PathBuf,
    /// RFC 3339 time of the previous check, if any
    pub last_check: Option<String>,
    pub env: BTreeMap<String, String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptOutcome {
    Checked { triggered: bool, context: Option<Json> },
    Error(String),
    /// Stopped by daemon shutdown; not the script's fault
    Cancelled,
}

#[async_trait]
pub trait WatchScriptRunner: Clone + Send + Sync + 'static {
    async fn run(&self, request: ScriptRequest) -> ScriptOutcome;
}

#[derive(Serialize)]
struct WatcherConfigEnv<'a> {
    agent_name: &'a str,
    last_check: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ScriptReport {
    #[serde(default)]
    triggered: bool,
    #[serde(default)]
    context: Option<Json>,
    #[serde(default)]
    error: Option<String>,
}

/// Runs scripts as real subprocesses, picking an interpreter by extension.
#[derive(Debug, Clone)]
pub struct ProcessScriptRunner {
    supervision: Supervision,
}

impl ProcessScriptRunner {
    pub fn new(supervision: Supervision) -> Self {
        Self { supervision }
    }
}

/// `.py` → python3, `.js`/`.mjs` → node, `.sh` → sh, else run directly.
pub fn command_for(script: &Path) -> Command {
    let interpreter = match script.extension().and_then(|e| e.to_str()) {
        Some("py") => Some("python3"),
        Some("js" | "mjs") => Some("node"),
        Some("sh") => Some("sh"),
        _ => None,
    };
    match interpreter {
        Some(program) => {
            let mut cmd = Command::new(program);
            cmd.arg(script);
            cmd
        }
        None => Command::new(script),
    }
}

/// Interpret a finished script's exit status and stdout.
pub fn parse_report(success: bool, code: Option<i32>, stdout: &str) -> ScriptOutcome {
    if !success {
        let code = code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string());
        return ScriptOutcome::Error(format!("script exited with {code}: {}", stdout.trim()));
    }
    let Some(line) = stdout.lines().rev().map(str::trim).find(|l| !l.is_empty()) else {
        return ScriptOutcome::Error("script produced no output".to_string());
    };
    match serde_json::from_str::<ScriptReport>(line) {
        Ok(ScriptReport { error: Some(error), .. }) => ScriptOutcome::Error(error),
        Ok(ScriptReport { triggered, context, .. }) => ScriptOutcome::Checked { triggered, context },
        Err(e) => ScriptOutcome::Error(format!("unparsable script output: {e}")),
    }
}

#[async_trait]
impl WatchScriptRunner for ProcessScriptRunner {
    async fn run(&self, request: ScriptRequest) -> ScriptOutcome {
        let config = WatcherConfigEnv {
            agent_name: &request.agent,
            last_check: request.last_check.as_deref(),
        };
        let config = match serde_json::to_string(&config) {
            Ok(json) => json,
            Err(e) => return ScriptOutcome::Error(e.to_string()),
        };

        let mut cmd = command_for(&request.script);
        cmd.envs(&request.env).env("CX_WATCHER_CONFIG", config);
        if let Some(dir) = request.script.parent() {
            cmd.current_dir(dir);
        }

        match run_with_timeout(cmd, &request.agent, request.timeout, &self.supervision, "watch script")
            .await
        {
            Ok(output) => parse_report(
                output.status.success(),
                output.status.code(),
                &String::from_utf8_lossy(&output.stdout),
            ),
            Err(ProcessError::Cancelled { .. }) => ScriptOutcome::Cancelled,
            Err(e) => ScriptOutcome::Error(e.to_string()),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::{ScriptOutcome, ScriptRequest, WatchScriptRunner};

    #[derive(Default)]
    struct FakeScriptState {
        outcomes: VecDeque<ScriptOutcome>,
        calls: Vec<ScriptRequest>,
    }

    /// Script runner that replays queued outcomes; quiet when the queue is empty.
    #[derive(Clone, Default)]
    pub struct FakeScriptRunner {
        inner: Arc<Mutex<FakeScriptState>>,
    }

    impl FakeScriptRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&self, outcome: ScriptOutcome) {
            self.inner.lock().outcomes.push_back(outcome);
        }

        pub fn calls(&self) -> Vec<ScriptRequest> {
            self.inner.lock().calls.clone()
        }
    }

    #[async_trait]
    impl WatchScriptRunner for FakeScriptRunner {
        async fn run(&self, request: ScriptRequest) -> ScriptOutcome {
            let mut inner = self.inner.lock();
            inner.calls.push(request);
            inner
                .outcomes
                .pop_front()
                .unwrap_or(ScriptOutcome::Checked { triggered: false, context: None })
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeScriptRunner;

#[cfg(test)]
#[path = "script_tests.rs"]
mod tests;
