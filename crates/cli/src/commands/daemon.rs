// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `cx daemon` - Daemon management commands

use std::path::Path;

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use serde_json::json;

use crate::client::DaemonClient;
use crate::daemon_process;
use crate::output::{format_elapsed, format_or_json, OutputFormat};

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon (background unless --foreground)
    Start {
        /// Run in foreground (useful for debugging)
        #[arg(long)]
        foreground: bool,
    },
    /// Stop the daemon
    Stop,
    /// Check daemon status
    Status,
}

pub async fn daemon(
    args: DaemonArgs,
    client: &DaemonClient,
    state_dir: &Path,
    format: OutputFormat,
) -> Result<()> {
    match args.command {
        DaemonCommand::Start { foreground } => start(client, state_dir, foreground).await,
        DaemonCommand::Stop => stop(state_dir),
        DaemonCommand::Status => status(client, format).await,
    }
}

async fn start(client: &DaemonClient, state_dir: &Path, foreground: bool) -> Result<()> {
    if let Ok(state) = client.status().await {
        println!("Daemon already running (pid {})", state.pid);
        return Ok(());
    }
    if foreground {
        return daemon_process::run_foreground();
    }
    daemon_process::start_background(state_dir)?;
    println!("Daemon started");
    Ok(())
}

fn stop(state_dir: &Path) -> Result<()> {
    match daemon_process::stop(state_dir) {
        Ok(true) => {
            println!("Daemon stopped");
            Ok(())
        }
        Ok(false) => {
            println!("Daemon not running");
            Ok(())
        }
        Err(e) => Err(anyhow!("Failed to stop daemon: {}", e)),
    }
}

async fn status(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let state = match client.status().await {
        Ok(state) => state,
        Err(e) if e.is_not_running() => {
            return format_or_json(format, &json!({ "status": "not_running" }), || {
                println!("Daemon not running")
            });
        }
        Err(e) => return Err(anyhow!("{}", e)),
    };

    let uptime = (chrono::Utc::now() - state.started_at).num_seconds().max(0) as u64;
    let obj = json!({
        "status": "running",
        "pid": state.pid,
        "uptime_secs": uptime,
        "agents": state.agents.len(),
        "socket": client.socket_path(),
    });
    format_or_json(format, &obj, || {
        println!("Status: running");
        println!("PID: {}", state.pid);
        println!("Uptime: {}", format_elapsed(uptime));
        println!("Agents: {}", state.agents.len());
    })
}
