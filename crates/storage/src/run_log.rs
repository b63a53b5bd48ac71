// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One markdown file per invocation under `runs/{YYYY-MM-DD}/`.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use cx_core::frontmatter;
use cx_core::{AgentDefinition, RunResult};
use serde::Serialize;

use crate::{write_atomic, StorageError, VaultPaths};

#[derive(Debug, Serialize)]
struct RunLogHeader<'a> {
    agent: &'a str,
    mode: String,
    categories: &'a [String],
    model: Option<&'a str>,
    session_id: Option<&'a str>,
    cost_usd: f64,
    duration_ms: u64,
    is_error: bool,
    input_tokens: u64,
    output_tokens: u64,
    timestamp: String,
}

#[derive(Debug, Clone)]
pub struct RunLogger {
    paths: VaultPaths,
}

impl RunLogger {
    pub fn new(paths: VaultPaths) -> Self {
        Self { paths }
    }

    /// Write the log for one run and return its path.
    pub fn log(
        &self,
        def: &AgentDefinition,
        result: &RunResult,
        at: DateTime<Utc>,
    ) -> Result<PathBuf, StorageError> {
        let path = self
            .paths
            .runs_dir()
            .join(at.format("%Y-%m-%d").to_string())
            .join(format!("{}-{}.md", def.name, at.format("%H%M%S")));

        let timestamp = cx_core::memory::timestamp(at);
        let header = RunLogHeader {
            agent: &def.name,
            mode: def.mode().to_string(),
            categories: &def.categories,
            model: def.model.as_deref(),
            session_id: result.session_id.as_deref(),
            cost_usd: result.cost_usd,
            duration_ms: result.duration_ms,
            is_error: result.is_error,
            input_tokens: result.input_tokens(),
            output_tokens: result.output_tokens(),
            timestamp: timestamp.clone(),
        };
        let body = format!(
            "\n# Run: {}\n\n**Time**: {}\n**Duration**: {:.1}s\n**Cost**: ${:.4}\n**Status**: {}\n\n## Result\n\n{}\n",
            def.name,
            timestamp,
            result.duration_secs(),
            result.cost_usd,
            result.status_label(),
            result.result.trim(),
        );
        let rendered = frontmatter::render(&header, &body)
            .map_err(|source| StorageError::Frontmatter { path: path.clone(), source })?;
        write_atomic(&path, rendered.as_bytes())?;
        Ok(path)
    }
}
