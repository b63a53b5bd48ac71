// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cx-core: domain types for the cx agent supervisor

pub mod macros;

pub mod agent;
pub mod clock;
pub mod frontmatter;
pub mod memory;
pub mod run;
pub mod schedule;
pub mod state;
pub mod trigger;

pub use agent::{
    AgentDefinition, AgentMode, AgentStats, AgentStatus, DefinitionError, ExecutionConfig,
    MemoryPolicy, NotificationChannel, NotificationEvent, NotificationSubscription,
    PersistentConfig, ResourceLimits, RestartPolicy, ScheduleConfig, StatsPatch, WatcherConfig,
};
pub use clock::{Clock, FakeClock, SystemClock};
pub use memory::{
    Archive, EntryKind, HotMemory, MemoryEntry, MemoryParseError, TokenCounter,
    WordCountHeuristic,
};
pub use run::{truncate_chars, RunResult, TokenUsage};
pub use schedule::{CronSchedule, ScheduleError};
pub use state::{DaemonAgentState, DaemonState};
