// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `cx test-watcher <name>`: run a watcher's check script once and report
//! whether the daemon would trigger the agent.

use std::path::{Path, PathBuf};

use anyhow::Result;
use cx_adapters::script::SCRIPT_TIMEOUT;
use cx_adapters::{
    ProcessRegistry, ProcessScriptRunner, ScriptOutcome, ScriptRequest, Supervision,
    WatchScriptRunner,
};
use cx_core::{trigger, AgentDefinition, AgentMode};
use cx_storage::{load_secrets, DefinitionStore, VaultPaths};
use serde::Serialize;
use serde_json::Value as Json;
use tokio_util::sync::CancellationToken;

use crate::color;
use crate::exit_error::ExitError;
use crate::output::{format_or_json, OutputFormat};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct WatcherCheck {
    pub script: PathBuf,
    pub triggered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Json>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Whether the daemon would run the agent on this result
    pub would_trigger: bool,
}

pub async fn handle(vault_root: &Path, name: &str, format: OutputFormat) -> Result<()> {
    let paths = VaultPaths::new(vault_root);
    let def = DefinitionStore::new(paths.clone()).read(name)?;
    let check = check(&paths, &def).await?;
    format_or_json(format, &check, || print!("{}", render(&check)))
}

/// Run the script the way the daemon does, with the agent's secrets.
pub(crate) async fn check(paths: &VaultPaths, def: &AgentDefinition) -> Result<WatcherCheck> {
    let watcher = match (def.mode(), def.execution.watcher.as_ref()) {
        (AgentMode::Watcher, Some(watcher)) => watcher,
        (AgentMode::Watcher, None) => {
            let message = format!("Agent \"{}\" has no watcher script configured", def.name);
            return Err(ExitError::new(1, message).into());
        }
        (mode, _) => {
            let message = format!("Agent \"{}\" is not a watcher agent (mode: {mode})", def.name);
            return Err(ExitError::new(1, message).into());
        }
    };

    let script = paths.watchers_dir().join(&watcher.script);
    let request = ScriptRequest {
        agent: def.name.clone(),
        script: script.clone(),
        last_check: None,
        env: load_secrets(&paths.secrets_dir(), def.env_ref.as_deref())?,
        timeout: SCRIPT_TIMEOUT,
    };
    let runner =
        ProcessScriptRunner::new(Supervision::new(ProcessRegistry::new(), CancellationToken::new()));
    let outcome = runner.run(request).await;
    Ok(verdict(script, outcome, watcher.trigger_condition.as_deref()))
}

/// Same rule as the daemon: the script must report `triggered`, and a
/// condition, when both it and a context exist, must hold on the context.
pub(crate) fn verdict(
    script: PathBuf,
    outcome: ScriptOutcome,
    condition: Option<&str>,
) -> WatcherCheck {
    let (triggered, context, error) = match outcome {
        ScriptOutcome::Checked { triggered, context } => (triggered, context, None),
        ScriptOutcome::Error(error) => (false, None, Some(error)),
        ScriptOutcome::Cancelled => (false, None, Some("script was cancelled".to_string())),
    };
    let would_trigger = triggered
        && match (condition, &context) {
            (Some(condition), Some(ctx)) => trigger::evaluate(condition, ctx),
            _ => true,
        };
    WatcherCheck {
        script,
        triggered,
        context,
        error,
        condition: condition.map(str::to_string),
        would_trigger,
    }
}

pub(crate) fn render(check: &WatcherCheck) -> String {
    let mut out = format!("Script: {}\n", check.script.display());
    if let Some(error) = &check.error {
        out.push_str(&color::failed(&format!("Error: {error}")));
        out.push('\n');
        return out;
    }
    out.push_str(&format!("triggered: {}\n", check.triggered));
    if let Some(context) = &check.context {
        let pretty = serde_json::to_string_pretty(context).unwrap_or_else(|_| context.to_string());
        out.push_str(&format!("context: {pretty}\n"));
    }
    if let Some(condition) = &check.condition {
        out.push_str(&format!("condition: {condition}\n"));
    }
    let verdict = if check.would_trigger {
        "Agent WOULD be triggered"
    } else {
        "Agent would NOT be triggered"
    };
    out.push_str(&format!("\n{}\n", color::header(verdict)));
    out
}

#[cfg(test)]
#[path = "test_watcher_tests.rs"]
mod tests;
