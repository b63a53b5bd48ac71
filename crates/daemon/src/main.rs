// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! cx daemon (cxd)
//!
//! Background process that ticks every agent in the vault, serves the
//! control socket and keeps the state snapshot current.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod dispatch;
mod env;
mod lifecycle;
mod listener;
mod memory;
mod scheduler;
mod shared;
mod vault;
mod watch;

use cx_daemon::protocol;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use cx_adapters::{
    ChannelNotifyAdapter, ClaudeBackend, ProcessScriptRunner, Supervision, TelegramNotifyAdapter,
};
use cx_core::SystemClock;
use cx_storage::VaultPaths;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::DaemonConfig;
use crate::lifecycle::{Config, LifecycleError, StartupResult};
use crate::listener::ListenCtx;
use crate::scheduler::{Scheduler, SchedulerConfig, SchedulerCtx, SchedulerDeps};
use crate::vault::Vault;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    std::fs::create_dir_all(&config.state_dir)?;
    write_startup_marker(&config.log_path)?;
    let _guard = setup_logging(&config.log_path);

    if let Err(e) = run(config).await {
        error!("Failed to start daemon: {}", e);
        return Err(e.into());
    }
    Ok(())
}

fn notifier(settings: &DaemonConfig) -> ChannelNotifyAdapter {
    let telegram = settings
        .telegram()
        .map(|t| TelegramNotifyAdapter::new(&t.bot_token, &t.default_chat_id));
    if telegram.is_none() && settings.notifications.telegram.is_some() {
        warn!("telegram notifications need bot_token and default_chat_id; channel disabled");
    }
    ChannelNotifyAdapter::new(telegram)
}

/// Separate this run's log lines from earlier ones; `cx daemon start`
/// reads the log back from the last marker to report startup errors.
fn write_startup_marker(log_path: &Path) -> std::io::Result<()> {
    let mut log = std::fs::OpenOptions::new().create(true).append(true).open(log_path)?;
    writeln!(log, "--- cxd: starting (pid: {}) ---\n", std::process::id())
}

async fn run(config: Config) -> Result<(), LifecycleError> {
    let settings = match env::config_path() {
        Some(path) => DaemonConfig::load(&path)?,
        None => DaemonConfig::default(),
    };

    let StartupResult { mut daemon, listener } = lifecycle::startup(&config).await?;

    let vault = Vault::new(VaultPaths::new(settings.vault_root()));
    let supervision = Supervision::new(daemon.registry.clone(), daemon.kill.clone());
    let backend = ClaudeBackend::new(&settings.claude_path, supervision.clone());
    let deps = SchedulerDeps {
        backend,
        scripts: ProcessScriptRunner::new(supervision),
        notifier: notifier(&settings),
    };
    let ctx = SchedulerCtx {
        state: daemon.state.clone(),
        registry: daemon.registry.clone(),
        vault: vault.clone(),
        store: daemon.store.clone(),
    };
    let scheduler_config = SchedulerConfig {
        default_model: settings.default_model.clone(),
        compaction_model: settings.compaction.default_model.clone(),
        tick_interval: env::tick_interval_ms().unwrap_or_else(|| settings.tick_interval()),
    };
    let scheduler = Scheduler::new(deps, ctx, scheduler_config, SystemClock);

    let listen_ctx = ListenCtx {
        state: daemon.state.clone(),
        registry: daemon.registry.clone(),
        vault: vault.clone(),
        compactor: scheduler.compactor(),
    };

    daemon.spawn_scheduler(scheduler);
    daemon.spawn_listener(listener, Arc::new(listen_ctx));
    if let Err(e) = daemon.watch_definitions(&vault.paths.agents_dir()) {
        daemon.shutdown().await;
        return Err(e);
    }

    info!(vault = %vault.paths.root().display(), "Daemon ready");
    let waited = wait_for_signal().await;
    daemon.shutdown().await;
    waited.map_err(LifecycleError::Io)
}

/// Block until SIGTERM or SIGINT.
async fn wait_for_signal() -> std::io::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM"),
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Received SIGINT");
        }
    }
    Ok(())
}

/// Log to `daemon.log` in the state directory. `RUST_LOG` overrides the
/// default `info` level.
fn setup_logging(log_path: &Path) -> Option<WorkerGuard> {
    let dir = log_path.parent()?;
    let file_name = log_path.file_name()?;
    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
        .init();
    Some(guard)
}
