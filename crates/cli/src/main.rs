// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! cx - command-line client for the cx agent daemon

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod color;
mod commands;
mod daemon_process;
mod env;
mod exit_error;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::client::DaemonClient;
use crate::commands::agent::{self, Action};
use crate::commands::costs::CostGrouping;
use crate::commands::daemon::DaemonArgs;
use crate::commands::list::ListFilter;
use crate::exit_error::ExitError;
use crate::output::OutputFormat;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_GIT_HASH"), ")");

#[derive(Parser)]
#[command(name = "cx", version = VERSION, about = "Run and supervise autonomous agents")]
#[command(styles = color::styles())]
pub(crate) struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Show the daemon and every agent it tracks
    Status,
    /// List agent definitions in the vault
    List(ListFilter),
    /// Run an agent on the next tick
    Start { name: String },
    /// Stop an agent
    Stop { name: String },
    /// Pause an agent
    Pause { name: String },
    /// Resume a paused or failed agent
    Resume { name: String },
    /// Compact an agent's hot memory into an archive
    Compact {
        name: Option<String>,
        /// Compact every agent over its threshold
        #[arg(long)]
        all: bool,
    },
    /// Summarize the cost ledger
    Costs {
        #[arg(long, value_enum, default_value_t)]
        by: CostGrouping,
        /// Only runs whose timestamp starts with this (e.g. 2026-03)
        #[arg(long)]
        period: Option<String>,
    },
    /// Print an agent's hot memory
    Memory { name: String },
    /// Show an agent's recent run logs
    Logs {
        name: String,
        /// How many logs to show, newest first
        #[arg(long, default_value_t = 5)]
        last: usize,
        /// Include the log frontmatter
        #[arg(long)]
        full: bool,
    },
    /// Run a watcher's check script once without the daemon
    TestWatcher { name: String },
    /// Daemon management
    Daemon(DaemonArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        if let Some(exit) = e.downcast_ref::<ExitError>() {
            if !exit.message.is_empty() {
                eprintln!("{}", exit.message);
            }
            std::process::exit(exit.code);
        }
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let format = cli.output;
    let state_dir = env::state_dir()?;
    let client = DaemonClient::new(env::socket_path(&state_dir), env::ipc_timeout());

    match cli.command {
        Commands::Status => commands::status::handle(&client, format).await,
        Commands::List(filter) => commands::list::handle(&env::vault_root()?, &filter, format),
        Commands::Start { name } => agent::handle(&client, Action::Start, name, format).await,
        Commands::Stop { name } => agent::handle(&client, Action::Stop, name, format).await,
        Commands::Pause { name } => agent::handle(&client, Action::Pause, name, format).await,
        Commands::Resume { name } => agent::handle(&client, Action::Resume, name, format).await,
        Commands::Compact { name, all } => {
            commands::compact::handle(&client, name, all, format).await
        }
        Commands::Costs { by, period } => {
            commands::costs::handle(&env::vault_root()?, by, period.as_deref(), format)
        }
        Commands::Memory { name } => commands::memory::handle(&env::vault_root()?, &name, format),
        Commands::Logs { name, last, full } => {
            commands::logs::handle(&env::vault_root()?, &name, last, full, format)
        }
        Commands::TestWatcher { name } => {
            commands::test_watcher::handle(&env::vault_root()?, &name, format).await
        }
        Commands::Daemon(args) => {
            commands::daemon::daemon(args, &client, &state_dir, format).await
        }
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
