// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent definitions.
//!
//! An agent is declared in a markdown file: YAML frontmatter carries the
//! execution config, the body carries the instructions. The types here are
//! the parsed frontmatter; storage owns reading and writing the files.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_HEARTBEAT_SECS: u64 = 1800;
pub const DEFAULT_CHECKPOINT_MINUTES: u64 = 60;
pub const DEFAULT_RESTART_DELAY_SECS: u64 = 30;
pub const DEFAULT_COMPACTION_THRESHOLD: u64 = 4000;

/// Execution discipline of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentMode {
    Scheduled,
    Watcher,
    Persistent,
}

crate::simple_display! {
    AgentMode {
        Scheduled => "scheduled",
        Watcher => "watcher",
        Persistent => "persistent",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    #[default]
    Active,
    Paused,
    Stopped,
    Failed,
}

crate::simple_display! {
    AgentStatus {
        Active => "active",
        Paused => "paused",
        Stopped => "stopped",
        Failed => "failed",
    }
}

impl AgentStatus {
    /// Paused and stopped agents are skipped by the scheduler.
    pub fn is_schedulable(self) -> bool {
        !matches!(self, AgentStatus::Paused | AgentStatus::Stopped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartPolicy {
    Always,
    OnFailure,
    #[default]
    Never,
}

crate::simple_display! {
    RestartPolicy {
        Always => "always",
        OnFailure => "on_failure",
        Never => "never",
    }
}

impl RestartPolicy {
    pub fn should_restart(self, is_error: bool) -> bool {
        match self {
            RestartPolicy::Always => true,
            RestartPolicy::OnFailure => is_error,
            RestartPolicy::Never => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    Completion,
    Failure,
    Trigger,
    BudgetWarning,
}

crate::simple_display! {
    NotificationEvent {
        Completion => "completion",
        Failure => "failure",
        Trigger => "trigger",
        BudgetWarning => "budget_warning",
    }
}

impl NotificationEvent {
    pub const ALL: [NotificationEvent; 4] = [
        NotificationEvent::Completion,
        NotificationEvent::Failure,
        NotificationEvent::Trigger,
        NotificationEvent::BudgetWarning,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Desktop,
    Telegram,
}

crate::simple_display! {
    NotificationChannel {
        Desktop => "desktop",
        Telegram => "telegram",
    }
}

/// One notification subscription. Missing `events` means all events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSubscription {
    pub channel: NotificationChannel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<NotificationEvent>>,
}

impl NotificationSubscription {
    pub fn wants(&self, event: NotificationEvent) -> bool {
        match &self.events {
            Some(events) => events.contains(&event),
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub expression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Script file name, relative to the watchers directory
    pub script: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_context: Option<bool>,
}

impl WatcherConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds.unwrap_or(DEFAULT_POLL_INTERVAL_SECS))
    }

    pub fn cooldown(&self) -> Option<Duration> {
        self.cooldown_seconds.filter(|s| *s > 0).map(Duration::from_secs)
    }

    pub fn pass_context(&self) -> bool {
        self.pass_context.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersistentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat_interval_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_interval_minutes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_session_duration_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart_policy: Option<RestartPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart_delay_seconds: Option<u64>,
}

impl PersistentConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_seconds.unwrap_or(DEFAULT_HEARTBEAT_SECS))
    }

    pub fn checkpoint_interval(&self) -> Duration {
        Duration::from_secs(
            self.checkpoint_interval_minutes.unwrap_or(DEFAULT_CHECKPOINT_MINUTES) * 60,
        )
    }

    /// `None` means sessions never expire.
    pub fn max_session_duration(&self) -> Option<Duration> {
        self.max_session_duration_hours
            .filter(|h| h.is_finite() && *h > 0.0)
            .map(|h| Duration::from_secs_f64(h * 3600.0))
    }

    pub fn restart_policy(&self) -> RestartPolicy {
        self.restart_policy.unwrap_or_default()
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_secs(self.restart_delay_seconds.unwrap_or(DEFAULT_RESTART_DELAY_SECS))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    pub mode: AgentMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ScheduleConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watcher: Option<WatcherConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent: Option<PersistentConfig>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cost_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration_seconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MemoryPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_current_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_access: Option<bool>,
}

/// Run statistics maintained in the definition's frontmatter.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AgentStats {
    #[serde(default)]
    pub total_runs: u64,
    #[serde(default)]
    pub total_cost_usd: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_status: Option<String>,
}

/// Patch applied to [`AgentStats`] after a recorded run.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsPatch {
    pub cost_usd: f64,
    pub at: String,
    pub is_error: bool,
}

impl AgentStats {
    pub fn apply(&mut self, patch: &StatsPatch) {
        self.total_runs += 1;
        self.total_cost_usd += patch.cost_usd;
        self.last_run = Some(patch.at.clone());
        self.last_status = Some(if patch.is_error { "failed" } else { "success" }.to_string());
    }
}

/// A parsed agent definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub name: String,
    #[serde(default)]
    pub status: AgentStatus,
    pub execution: ExecutionConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_ref: Option<String>,
    #[serde(default)]
    pub resource_limits: ResourceLimits,
    #[serde(default)]
    pub memory: MemoryPolicy,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notifications: Vec<NotificationSubscription>,
    #[serde(flatten)]
    pub stats: AgentStats,
    /// Markdown body: the agent's instructions
    #[serde(skip)]
    pub body: String,
}

/// Malformed agent definition
#[derive(Debug, Error, PartialEq)]
pub enum DefinitionError {
    #[error("agent name must not be empty")]
    EmptyName,
    #[error("scheduled agent '{0}' must have execution.schedule")]
    MissingSchedule(String),
    #[error("watcher agent '{0}' must have execution.watcher")]
    MissingWatcher(String),
}

impl AgentDefinition {
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.name.trim().is_empty() {
            return Err(DefinitionError::EmptyName);
        }
        match self.execution.mode {
            AgentMode::Scheduled if self.execution.schedule.is_none() => {
                Err(DefinitionError::MissingSchedule(self.name.clone()))
            }
            AgentMode::Watcher if self.execution.watcher.is_none() => {
                Err(DefinitionError::MissingWatcher(self.name.clone()))
            }
            _ => Ok(()),
        }
    }

    pub fn mode(&self) -> AgentMode {
        self.execution.mode
    }

    /// Persistent config, falling back to defaults when the block is absent.
    pub fn persistent(&self) -> PersistentConfig {
        self.execution.persistent.clone().unwrap_or_default()
    }

    pub fn memory_enabled(&self) -> bool {
        self.memory.enabled.unwrap_or(true)
    }

    pub fn archive_access(&self) -> bool {
        self.memory.archive_access.unwrap_or(true)
    }

    pub fn compaction_threshold(&self) -> u64 {
        self.memory.max_current_tokens.unwrap_or(DEFAULT_COMPACTION_THRESHOLD)
    }

    pub fn max_budget_usd(&self) -> Option<f64> {
        self.resource_limits.max_cost_usd
    }

    pub fn wants(&self, event: NotificationEvent) -> bool {
        self.notifications.iter().any(|n| n.wants(event))
    }
}

#[cfg(any(test, feature = "test-support"))]
impl AgentDefinition {
    fn with_execution(name: &str, execution: ExecutionConfig) -> Self {
        Self {
            name: name.to_string(),
            status: AgentStatus::Active,
            execution,
            categories: Vec::new(),
            model: None,
            tools: Vec::new(),
            env_ref: None,
            resource_limits: ResourceLimits::default(),
            memory: MemoryPolicy::default(),
            notifications: Vec::new(),
            stats: AgentStats::default(),
            body: format!("You are {name}."),
        }
    }

    pub fn scheduled(name: &str, expression: &str) -> Self {
        Self::with_execution(
            name,
            ExecutionConfig {
                mode: AgentMode::Scheduled,
                schedule: Some(ScheduleConfig { expression: expression.to_string(), timezone: None }),
                watcher: None,
                persistent: None,
            },
        )
    }

    pub fn watcher(name: &str, script: &str) -> Self {
        Self::with_execution(
            name,
            ExecutionConfig {
                mode: AgentMode::Watcher,
                schedule: None,
                watcher: Some(WatcherConfig { script: script.to_string(), ..Default::default() }),
                persistent: None,
            },
        )
    }

    pub fn persistent_agent(name: &str) -> Self {
        Self::with_execution(
            name,
            ExecutionConfig {
                mode: AgentMode::Persistent,
                schedule: None,
                watcher: None,
                persistent: Some(PersistentConfig::default()),
            },
        )
    }

    /// Subscribe to every event on the desktop channel.
    pub fn notify_all(mut self) -> Self {
        self.notifications =
            vec![NotificationSubscription { channel: NotificationChannel::Desktop, events: None }];
        self
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
