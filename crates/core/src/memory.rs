// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two-tier agent memory: mutable hot memory and immutable archives.
//!
//! Hot memory is stored as markdown:
//!
//! ```text
//! ---
//! agent_name: digest
//! token_count: 42
//! ---
//!
//! # Persistent Notes
//!
//! Prefers short summaries.
//!
//! # Recent Entries
//!
//! ## 2026-01-01T09:00:00.000Z [run_result]
//!
//! **Status**: SUCCESS
//! ```
//!
//! Content lines that start with `#` are escaped with a leading backslash so
//! they cannot be mistaken for section or entry headings.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::frontmatter::{self, FrontmatterError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    RunResult,
    Checkpoint,
    Note,
    Compaction,
}

crate::simple_display! {
    EntryKind {
        RunResult => "run_result",
        Checkpoint => "checkpoint",
        Note => "note",
        Compaction => "compaction",
    }
}

impl EntryKind {
    fn parse(s: &str) -> Self {
        match s {
            "run_result" => EntryKind::RunResult,
            "checkpoint" => EntryKind::Checkpoint,
            "compaction" => EntryKind::Compaction,
            _ => EntryKind::Note,
        }
    }
}

/// Timestamp format used for memory entries and archives.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub timestamp: String,
    pub kind: EntryKind,
    pub content: String,
}

impl MemoryEntry {
    /// Content is trimmed; surrounding whitespace does not survive storage.
    pub fn new(kind: EntryKind, content: impl AsRef<str>, at: DateTime<Utc>) -> Self {
        Self { timestamp: timestamp(at), kind, content: content.as_ref().trim().to_string() }
    }

    fn heading(&self) -> String {
        format!("{} [{}]", self.timestamp, self.kind)
    }
}

/// Estimates token counts from text.
pub trait TokenCounter {
    fn count(&self, text: &str) -> u64;
}

/// Whitespace word count scaled by a multiplier (default 1.4), rounded up.
#[derive(Debug, Clone, Copy)]
pub struct WordCountHeuristic {
    /// Multiplier in tenths, so 14 means 1.4
    tenths: u64,
}

impl Default for WordCountHeuristic {
    fn default() -> Self {
        Self { tenths: 14 }
    }
}

impl TokenCounter for WordCountHeuristic {
    fn count(&self, text: &str) -> u64 {
        let words = text.split_whitespace().count() as u64;
        (words * self.tenths).div_ceil(10)
    }
}

#[derive(Debug, Error)]
pub enum MemoryParseError {
    #[error(transparent)]
    Frontmatter(#[from] FrontmatterError),
}

#[derive(Debug, Serialize, Deserialize)]
struct MemoryHeader {
    #[serde(default)]
    agent_name: String,
    #[serde(default)]
    token_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_compacted: Option<String>,
}

/// Per-agent working memory.
///
/// The token count is derived: every constructor and mutator recomputes it
/// from the serialized form.
#[derive(Debug, Clone, PartialEq)]
pub struct HotMemory {
    agent_name: String,
    token_count: u64,
    last_compacted: Option<String>,
    persistent_notes: String,
    entries: Vec<MemoryEntry>,
}

impl HotMemory {
    pub fn empty(agent_name: impl Into<String>) -> Self {
        let mut mem = Self {
            agent_name: agent_name.into(),
            token_count: 0,
            last_compacted: None,
            persistent_notes: String::new(),
            entries: Vec::new(),
        };
        mem.recount();
        mem
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    pub fn token_count(&self) -> u64 {
        self.token_count
    }

    pub fn last_compacted(&self) -> Option<&str> {
        self.last_compacted.as_deref()
    }

    pub fn persistent_notes(&self) -> &str {
        &self.persistent_notes
    }

    pub fn entries(&self) -> &[MemoryEntry] {
        &self.entries
    }

    pub fn push(&mut self, entry: MemoryEntry) {
        self.entries.push(entry);
        self.recount();
    }

    pub fn set_persistent_notes(&mut self, notes: impl AsRef<str>) {
        self.persistent_notes = notes.as_ref().trim().to_string();
        self.recount();
    }

    /// Most recent `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> &[MemoryEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    /// Entries to summarize and the entry to keep, or `None` with fewer
    /// than two entries.
    pub fn compaction_split(&self) -> Option<(&[MemoryEntry], &MemoryEntry)> {
        match self.entries.split_last() {
            Some((last, rest)) if !rest.is_empty() => Some((rest, last)),
            _ => None,
        }
    }

    /// Replacement memory after compaction: one summary entry plus the kept
    /// most-recent entry. Persistent notes carry over.
    pub fn compacted(&self, summary: &str, at: DateTime<Utc>) -> Option<HotMemory> {
        let (_, kept) = self.compaction_split()?;
        let mut mem = Self {
            agent_name: self.agent_name.clone(),
            token_count: 0,
            last_compacted: Some(timestamp(at)),
            persistent_notes: self.persistent_notes.clone(),
            entries: vec![MemoryEntry::new(EntryKind::Compaction, summary, at), kept.clone()],
        };
        mem.recount();
        Some(mem)
    }

    fn recount(&mut self) {
        self.token_count = WordCountHeuristic::default().count(&self.render_unchecked());
    }

    fn render_body(&self) -> String {
        let mut body = String::new();
        if !self.persistent_notes.is_empty() {
            body.push_str("\n# Persistent Notes\n\n");
            body.push_str(&escape(&self.persistent_notes));
            body.push('\n');
        }
        body.push_str("\n# Recent Entries\n");
        for entry in &self.entries {
            body.push_str("\n## ");
            body.push_str(&entry.heading());
            body.push_str("\n\n");
            body.push_str(&escape(&entry.content));
            body.push('\n');
        }
        body
    }

    fn header(&self) -> MemoryHeader {
        MemoryHeader {
            agent_name: self.agent_name.clone(),
            token_count: self.token_count,
            last_compacted: self.last_compacted.clone(),
        }
    }

    fn render_unchecked(&self) -> String {
        frontmatter::render(&self.header(), &self.render_body())
            .unwrap_or_else(|_| self.render_body())
    }

    /// Serialize to the markdown file format.
    pub fn to_markdown(&self) -> Result<String, MemoryParseError> {
        Ok(frontmatter::render(&self.header(), &self.render_body())?)
    }

    /// Parse the markdown file format. The token count is recomputed.
    pub fn from_markdown(raw: &str) -> Result<Self, MemoryParseError> {
        let (header, body): (MemoryHeader, String) = frontmatter::parse(raw)?;
        let mut mem = Self {
            agent_name: header.agent_name,
            token_count: 0,
            last_compacted: header.last_compacted,
            persistent_notes: unescape(&section(&body, "Persistent Notes")),
            entries: parse_entries(&section(&body, "Recent Entries")),
        };
        mem.recount();
        Ok(mem)
    }
}

/// Body of a top-level `# heading` section, trimmed.
///
/// Lines split on `\n` only, so a `\r` inside content survives.
fn section(body: &str, heading: &str) -> String {
    let marker = format!("# {heading}");
    let mut lines = body.split('\n');
    if !lines.by_ref().any(|line| line.trim_end() == marker) {
        return String::new();
    }
    let collected: Vec<&str> = lines.take_while(|line| !line.starts_with("# ")).collect();
    collected.join("\n").trim().to_string()
}

fn parse_entries(text: &str) -> Vec<MemoryEntry> {
    let mut entries = Vec::new();
    let mut current: Option<(String, EntryKind, Vec<&str>)> = None;
    for line in text.split('\n') {
        if let Some(heading) = line.strip_prefix("## ") {
            if let Some(done) = current.take() {
                entries.push(finish_entry(done));
            }
            current = parse_heading(heading).map(|(ts, kind)| (ts, kind, Vec::new()));
        } else if let Some((_, _, body)) = current.as_mut() {
            body.push(line);
        }
    }
    if let Some(done) = current {
        entries.push(finish_entry(done));
    }
    entries
}

fn parse_heading(heading: &str) -> Option<(String, EntryKind)> {
    let heading = heading.trim_end();
    let open = heading.rfind(" [")?;
    let kind = heading[open + 2..].strip_suffix(']')?;
    let ts = heading[..open].trim();
    if ts.is_empty() {
        return None;
    }
    Some((ts.to_string(), EntryKind::parse(kind.trim())))
}

fn finish_entry((timestamp, kind, body): (String, EntryKind, Vec<&str>)) -> MemoryEntry {
    MemoryEntry { timestamp, kind, content: unescape(body.join("\n").trim()) }
}

/// Prefix lines matching `^\\*#` with one more backslash.
fn escape(text: &str) -> String {
    map_lines(text, |line| {
        if line.trim_start_matches('\\').starts_with('#') {
            format!("\\{line}")
        } else {
            line.to_string()
        }
    })
}

/// Inverse of [`escape`].
fn unescape(text: &str) -> String {
    map_lines(text, |line| {
        match line.strip_prefix('\\') {
            Some(rest) if rest.trim_start_matches('\\').starts_with('#') => rest.to_string(),
            _ => line.to_string(),
        }
    })
}

fn map_lines(text: &str, f: impl Fn(&str) -> String) -> String {
    text.split('\n').map(f).collect::<Vec<_>>().join("\n")
}

/// Immutable compaction archive.
#[derive(Debug, Clone, PartialEq)]
pub struct Archive {
    pub period: String,
    pub content: String,
}

impl Archive {
    /// Period label: `YYYY-MM-{epoch_ms}`, unique per compaction.
    pub fn period_label(at: DateTime<Utc>) -> String {
        format!("{}-{}", at.format("%Y-%m"), at.timestamp_millis())
    }

    pub fn new(at: DateTime<Utc>, summary: &str, summarized: &[MemoryEntry]) -> Self {
        let entries = entries_text(summarized);
        let content = format!(
            "# Archive: {}\n\nCompacted: {}\n\n## Summary\n\n{}\n\n## Original Entries\n\n{}",
            at.format("%Y-%m"),
            timestamp(at),
            summary.trim(),
            entries
        );
        Self { period: Self::period_label(at), content }
    }
}

/// Render entries for a summarization prompt or archive.
pub fn entries_text(entries: &[MemoryEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("## {}\n{}", e.heading(), e.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
