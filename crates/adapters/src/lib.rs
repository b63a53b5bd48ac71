// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cx-adapters: subprocess-facing adapters for the cx daemon

pub mod backend;
pub mod notify;
pub mod registry;
pub mod script;
pub mod subprocess;

pub use backend::{ClaudeBackend, ExecutionBackend, InvokeRequest};
pub use notify::{
    ChannelNotifyAdapter, DesktopNotifyAdapter, Notification, NotifyAdapter, NotifyError,
    TelegramNotifyAdapter,
};
pub use registry::{ProcessRegistry, RegistrationGuard};
pub use script::{ProcessScriptRunner, ScriptOutcome, ScriptRequest, WatchScriptRunner};
pub use subprocess::{run_with_timeout, ProcessError, Supervision};

#[cfg(any(test, feature = "test-support"))]
pub use backend::FakeBackend;
#[cfg(any(test, feature = "test-support"))]
pub use notify::FakeNotifyAdapter;
#[cfg(any(test, feature = "test-support"))]
pub use script::FakeScriptRunner;
