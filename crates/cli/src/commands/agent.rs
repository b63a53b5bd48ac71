// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `cx start|stop|pause|resume <name>`

use anyhow::Result;
use cx_daemon::Request;
use serde_json::json;

use super::client_error;
use crate::client::DaemonClient;
use crate::output::{format_or_json, OutputFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Stop,
    Pause,
    Resume,
}

impl Action {
    pub fn request(self, name: String) -> Request {
        match self {
            Action::Start => Request::Start { name },
            Action::Stop => Request::Stop { name },
            Action::Pause => Request::Pause { name },
            Action::Resume => Request::Resume { name },
        }
    }
}

pub async fn handle(
    client: &DaemonClient,
    action: Action,
    name: String,
    format: OutputFormat,
) -> Result<()> {
    let request = action.request(name.clone());
    let message = client.mutate(&request).await.map_err(client_error)?;
    let obj = json!({ "agent": name, "method": request.method(), "message": message });
    format_or_json(format, &obj, || println!("{}", message))
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
