// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `cx logs <name>`: recent run logs from `runs/{date}/{name}-{HHMMSS}.md`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cx_core::frontmatter;
use cx_storage::VaultPaths;
use serde::Serialize;

use crate::color;
use crate::output::{format_or_json, OutputFormat};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct RunLogFile {
    pub path: PathBuf,
    /// `YYYY-MM-DD` directory name
    pub date: String,
    /// `HHMMSS` from the file name
    pub time: String,
}

#[derive(Serialize)]
struct LogEntry {
    #[serde(flatten)]
    file: RunLogFile,
    content: String,
}

pub fn handle(
    vault_root: &Path,
    name: &str,
    limit: usize,
    full: bool,
    format: OutputFormat,
) -> Result<()> {
    let runs_dir = VaultPaths::new(vault_root).runs_dir();
    let mut entries = Vec::new();
    for file in collect(&runs_dir, name)?.into_iter().take(limit) {
        let content = std::fs::read_to_string(&file.path)
            .with_context(|| format!("failed to read {}", file.path.display()))?;
        entries.push(LogEntry { file, content });
    }
    format_or_json(format, &entries, || {
        if entries.is_empty() {
            println!("No logs found for agent: {name}");
        }
        for entry in &entries {
            print!("{}", render(&entry.file, &entry.content, full));
        }
    })
}

/// Logs for `name`, newest first. A missing runs directory has none.
pub(crate) fn collect(runs_dir: &Path, name: &str) -> Result<Vec<RunLogFile>> {
    let mut dates = match read_names(runs_dir) {
        Ok(names) => names,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(anyhow::Error::new(e).context(format!("failed to read {}", runs_dir.display())))
        }
    };
    dates.sort_unstable_by(|a, b| b.cmp(a));

    let mut logs = Vec::new();
    for date in dates {
        let dir = runs_dir.join(&date);
        let Ok(mut files) = read_names(&dir) else {
            continue;
        };
        files.sort_unstable_by(|a, b| b.cmp(a));
        for file in files {
            if let Some(time) = log_time(&file, name) {
                logs.push(RunLogFile { path: dir.join(&file), date: date.clone(), time });
            }
        }
    }
    Ok(logs)
}

/// `HHMMSS` when `file` is one of `name`'s logs. Agents whose names share a
/// prefix (`mail` and `mail-digest`) do not match each other's files.
fn log_time(file: &str, name: &str) -> Option<String> {
    let time = file.strip_prefix(name)?.strip_prefix('-')?.strip_suffix(".md")?;
    (time.len() == 6 && time.bytes().all(|b| b.is_ascii_digit())).then(|| time.to_string())
}

fn read_names(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        if let Ok(name) = entry?.file_name().into_string() {
            names.push(name);
        }
    }
    Ok(names)
}

/// Heading plus either the whole file or just the body after frontmatter.
pub(crate) fn render(file: &RunLogFile, content: &str, full: bool) -> String {
    let heading = color::header(&format!("== {} {} ==", file.date, file.time));
    let text = if full {
        content.trim()
    } else {
        frontmatter::split(content).map(|(_, body)| body.trim()).unwrap_or(content.trim())
    };
    format!("\n{heading}\n{text}\n")
}

#[cfg(test)]
#[path = "logs_tests.rs"]
mod tests;
