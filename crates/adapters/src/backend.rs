// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution backend: one reasoning-process invocation per call.
//!
//! [`ExecutionBackend::invoke`] never fails. Spawn errors, timeouts and
//! unparsable output all come back as a [`RunResult`], with `is_error` set
//! where appropriate, so callers have a single outcome type to record.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use cx_core::{RunResult, TokenUsage};
use serde::Deserialize;
use tokio::process::Command;

use crate::subprocess::{run_with_timeout, Supervision};

/// Everything needed for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeRequest {
    /// Registry key for the spawned process
    pub agent: String,
    pub prompt: String,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub tools: Vec<String>,
    pub max_budget_usd: Option<f64>,
    /// Resume this session instead of starting a new one
    pub resume_session: Option<String>,
    pub timeout: Duration,
    pub env: BTreeMap<String, String>,
}

impl InvokeRequest {
    pub fn new(agent: impl Into<String>, prompt: impl Into<String>, timeout: Duration) -> Self {
        Self {
            agent: agent.into(),
            prompt: prompt.into(),
            model: None,
            system_prompt: None,
            tools: Vec::new(),
            max_budget_usd: None,
            resume_session: None,
            timeout,
            env: BTreeMap::new(),
        }
    }
}

#[async_trait]
pub trait ExecutionBackend: Clone + Send + Sync + 'static {
    async fn invoke(&self, request: InvokeRequest) -> RunResult;
}

/// Backend that shells out to the `claude` CLI in print mode.
#[derive(Debug, Clone)]
pub struct ClaudeBackend {
    program: PathBuf,
    supervision: Supervision,
}

impl ClaudeBackend {
    pub fn new(program: impl Into<PathBuf>, supervision: Supervision) -> Self {
        Self { program: program.into(), supervision }
    }

    /// CLI arguments for `request`, prompt last.
    pub fn args(request: &InvokeRequest) -> Vec<String> {
        let mut args: Vec<String> = vec!["-p".into(), "--output-format".into(), "json".into()];
        if let Some(model) = &request.model {
            args.extend(["--model".into(), model.clone()]);
        }
        if let Some(system) = &request.system_prompt {
            args.extend(["--system-prompt".into(), system.clone()]);
        }
        if !request.tools.is_empty() {
            args.extend(["--allowedTools".into(), request.tools.join(",")]);
        }
        if let Some(budget) = request.max_budget_usd.filter(|b| *b > 0.0) {
            args.extend(["--max-budget-usd".into(), budget.to_string()]);
        }
        if let Some(session) = &request.resume_session {
            args.extend(["--resume".into(), session.clone()]);
        }
        args.push("--dangerously-skip-permissions".into());
        args.push(request.prompt.clone());
        args
    }
}

#[async_trait]
impl ExecutionBackend for ClaudeBackend {
    async fn invoke(&self, request: InvokeRequest) -> RunResult {
        let mut cmd = Command::new(&self.program);
        cmd.args(Self::args(&request)).envs(&request.env);

        tracing::info!(
            agent = %request.agent,
            model = request.model.as_deref().unwrap_or("default"),
            resume = request.resume_session.is_some(),
            "invoking backend"
        );
        let start = Instant::now();
        let output =
            run_with_timeout(cmd, &request.agent, request.timeout, &self.supervision, "backend")
                .await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match output {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                parse_output(&stdout, &stderr, output.status.success(), duration_ms)
            }
            Err(e) => {
                tracing::warn!(agent = %request.agent, error = %e, "backend invocation failed");
                RunResult::failure(e.to_string(), duration_ms)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct BackendOutput {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    is_error: Option<bool>,
    #[serde(default)]
    total_cost_usd: Option<f64>,
    #[serde(default)]
    cost_usd: Option<f64>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

/// Parse the CLI's JSON output leniently.
///
/// The whole stdout is tried first, then the last non-empty line. Anything
/// else degrades to a raw-text result whose error flag is the exit status.
pub fn parse_output(stdout: &str, stderr: &str, success: bool, duration_ms: u64) -> RunResult {
    let parsed = serde_json::from_str::<BackendOutput>(stdout.trim()).ok().or_else(|| {
        let last = stdout.lines().rev().find(|l| !l.trim().is_empty())?;
        serde_json::from_str::<BackendOutput>(last.trim()).ok()
    });

    match parsed {
        Some(out) => RunResult {
            session_id: out.session_id.filter(|s| !s.is_empty()),
            result: out.result.unwrap_or_else(|| stdout.trim().to_string()),
            is_error: out.is_error.unwrap_or(!success),
            cost_usd: out.total_cost_usd.or(out.cost_usd).unwrap_or(0.0),
            usage: out.usage,
            duration_ms,
        },
        None => {
            let raw = if stdout.trim().is_empty() { stderr } else { stdout };
            RunResult {
                session_id: None,
                result: raw.trim().to_string(),
                is_error: !success,
                cost_usd: 0.0,
                usage: None,
                duration_ms,
            }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use async_trait::async_trait;
    use cx_core::RunResult;
    use parking_lot::Mutex;

    use super::{ExecutionBackend, InvokeRequest};

    #[derive(Default)]
    struct FakeBackendState {
        responses: VecDeque<RunResult>,
        calls: Vec<InvokeRequest>,
    }

    /// Backend that replays queued results and records requests.
    ///
    /// With an empty queue every call succeeds with a fixed result.
    #[derive(Clone, Default)]
    pub struct FakeBackend {
        inner: Arc<Mutex<FakeBackendState>>,
    }

    impl FakeBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&self, result: RunResult) {
            self.inner.lock().responses.push_back(result);
        }

        pub fn calls(&self) -> Vec<InvokeRequest> {
            self.inner.lock().calls.clone()
        }

        pub fn success(text: &str, session_id: Option<&str>) -> RunResult {
            RunResult {
                session_id: session_id.map(str::to_string),
                result: text.to_string(),
                is_error: false,
                cost_usd: 0.01,
                usage: None,
                duration_ms: 100,
            }
        }
    }

    #[async_trait]
    impl ExecutionBackend for FakeBackend {
        async fn invoke(&self, request: InvokeRequest) -> RunResult {
            let mut inner = self.inner.lock();
            inner.calls.push(request);
            inner.responses.pop_front().unwrap_or_else(|| FakeBackend::success("ok", None))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeBackend;

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
