// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spawning and stopping the `cxd` process.

use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use crate::env;

/// Marker `cxd` writes to its log before anything else on each start
pub const STARTUP_MARKER: &str = "--- cxd: starting";
const STARTUP_ERROR: &str = "Failed to start daemon: ";

const START_TIMEOUT: Duration = Duration::from_secs(5);
const STOP_TIMEOUT: Duration = Duration::from_secs(15);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Locate `cxd`: CX_DAEMON_BINARY, then next to this executable, then PATH.
pub fn find_cxd_binary() -> PathBuf {
    if let Ok(path) = std::env::var("CX_DAEMON_BINARY") {
        return PathBuf::from(path);
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("cxd")))
        .filter(|candidate| candidate.exists())
        .unwrap_or_else(|| PathBuf::from("cxd"))
}

/// Run `cxd` attached to this terminal until it exits.
pub fn run_foreground() -> Result<()> {
    let status = Command::new(find_cxd_binary()).status().context("failed to run cxd")?;
    if !status.success() {
        bail!("Daemon exited with status: {}", status);
    }
    Ok(())
}

/// Spawn `cxd` detached and wait for its socket to appear.
pub fn start_background(state_dir: &Path) -> Result<()> {
    let socket = env::socket_path(state_dir);
    let mut child = Command::new(find_cxd_binary())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .process_group(0)
        .spawn()
        .context("failed to spawn cxd")?;

    let deadline = Instant::now() + START_TIMEOUT;
    while Instant::now() < deadline {
        if socket.exists() && std::os::unix::net::UnixStream::connect(&socket).is_ok() {
            return Ok(());
        }
        if let Some(status) = child.try_wait()? {
            return Err(startup_failure(state_dir, &format!("cxd exited with {status}")));
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    Err(startup_failure(state_dir, "timed out waiting for the daemon socket"))
}

fn startup_failure(state_dir: &Path, fallback: &str) -> anyhow::Error {
    let log = std::fs::read_to_string(env::log_path(state_dir)).unwrap_or_default();
    match parse_startup_error(&log) {
        Some(reason) => anyhow!("Failed to start daemon: {}", reason),
        None => anyhow!("Failed to start daemon: {}", fallback),
    }
}

/// The error reported by the most recent start attempt in `log`, if any.
pub fn parse_startup_error(log: &str) -> Option<String> {
    let last_start = log.rfind(STARTUP_MARKER)?;
    log[last_start..]
        .lines()
        .filter_map(|line| line.find(STARTUP_ERROR).map(|i| &line[i + STARTUP_ERROR.len()..]))
        .last()
        .map(|reason| reason.trim().to_string())
}

/// SIGTERM the daemon named by the pid file and wait for it to exit.
///
/// Returns `false` when no daemon was running.
pub fn stop(state_dir: &Path) -> Result<bool> {
    let pid_path = env::pid_path(state_dir);
    let Some(pid) = read_pid(&pid_path)? else {
        return Ok(false);
    };

    match kill(pid, Signal::SIGTERM) {
        Ok(()) => {}
        Err(Errno::ESRCH) => return Ok(false),
        Err(e) => return Err(anyhow!("failed to signal daemon (pid {}): {}", pid, e)),
    }

    let deadline = Instant::now() + STOP_TIMEOUT;
    while Instant::now() < deadline {
        if !is_alive(pid) {
            return Ok(true);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    bail!("daemon (pid {}) did not exit within {:?}", pid, STOP_TIMEOUT)
}

fn read_pid(path: &Path) -> Result<Option<Pid>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
    };
    Ok(raw.trim().parse::<i32>().ok().filter(|pid| *pid > 0).map(Pid::from_raw))
}

fn is_alive(pid: Pid) -> bool {
    // Signal 0 probes for existence without delivering anything
    !matches!(kill(pid, None), Err(Errno::ESRCH))
}

#[cfg(test)]
#[path = "daemon_process_tests.rs"]
mod tests;
