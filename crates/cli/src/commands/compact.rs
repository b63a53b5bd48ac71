// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `cx compact [<name>|--all]`

use anyhow::Result;
use cx_daemon::CompactTarget;
use serde_json::json;

use super::client_error;
use crate::client::DaemonClient;
use crate::output::{format_or_json, require_name_or_all, OutputFormat};

pub async fn handle(
    client: &DaemonClient,
    name: Option<String>,
    all: bool,
    format: OutputFormat,
) -> Result<()> {
    let target = match require_name_or_all(name, all)? {
        Some(name) => CompactTarget::Agent(name),
        None => CompactTarget::All,
    };
    let compacted = client.compact(target).await.map_err(client_error)?;
    format_or_json(format, &json!({ "compacted": compacted }), || {
        if compacted.is_empty() {
            println!("Nothing to compact");
        }
        for name in &compacted {
            println!("Compacted {}", name);
        }
    })
}
