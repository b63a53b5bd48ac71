// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod agent;
pub mod compact;
pub mod costs;
pub mod daemon;
pub mod list;
pub mod logs;
pub mod memory;
pub mod status;
pub mod test_watcher;

use crate::client::ClientError;
use crate::exit_error::ExitError;

/// Turn a refused connection into the exit-1 "daemon not running" error.
pub(crate) fn client_error(e: ClientError) -> anyhow::Error {
    if e.is_not_running() {
        ExitError::not_running().into()
    } else {
        e.into()
    }
}
