// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print `data` as pretty JSON, or run `text_fn` for the text format.
pub fn format_or_json<T: Serialize>(
    format: OutputFormat,
    data: &T,
    text_fn: impl FnOnce(),
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
        OutputFormat::Text => {
            text_fn();
        }
    }
    Ok(())
}

/// Validate that a name is provided (or --all was passed).
pub fn require_name_or_all(name: Option<String>, all: bool) -> anyhow::Result<Option<String>> {
    match (name, all) {
        (Some(_), true) => anyhow::bail!("pass an agent name or --all, not both"),
        (None, false) => anyhow::bail!("agent name required (or use --all)"),
        (name, _) => Ok(name),
    }
}

/// Elapsed time as "5s", "2m", "1h", "3d"
pub fn format_elapsed(secs: u64) -> String {
    match secs {
        s if s < 60 => format!("{s}s"),
        s if s < 3600 => format!("{}m", s / 60),
        s if s < 86_400 => format!("{}h", s / 3600),
        s => format!("{}d", s / 86_400),
    }
}

/// Relative time for an optional timestamp, "-" when absent.
pub fn format_time_ago(at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match at {
        Some(at) => {
            let secs = (now - at).num_seconds().max(0) as u64;
            format!("{} ago", format_elapsed(secs))
        }
        None => "-".to_string(),
    }
}

/// Left-aligned columns sized to their widest cell.
pub struct Table {
    headers: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<&'static str>) -> Self {
        Self { headers, rows: Vec::new() }
    }

    pub fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.len()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.chars().count());
                }
            }
        }

        let last = widths.len().saturating_sub(1);
        let pad = |cells: &[String]| -> Vec<String> {
            cells
                .iter()
                .zip(&widths)
                .enumerate()
                .map(|(i, (cell, w))| {
                    if i == last {
                        cell.clone()
                    } else {
                        format!("{cell:<w$}", w = *w)
                    }
                })
                .collect()
        };

        let headers: Vec<String> = self.headers.iter().map(|h| h.to_string()).collect();
        let header: Vec<String> = pad(&headers).iter().map(|h| crate::color::header(h)).collect();
        let mut out = vec![header.join("  ")];
        out.extend(self.rows.iter().map(|row| pad(row).join("  ")));
        out.join("\n")
    }
}
