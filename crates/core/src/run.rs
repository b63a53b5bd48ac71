// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outcome of one backend invocation.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

/// Result of one invocation. Created once, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub session_id: Option<String>,
    pub result: String,
    pub is_error: bool,
    pub cost_usd: f64,
    pub usage: Option<TokenUsage>,
    pub duration_ms: u64,
}

impl RunResult {
    /// A failed invocation that never produced backend output.
    pub fn failure(message: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            session_id: None,
            result: message.into(),
            is_error: true,
            cost_usd: 0.0,
            usage: None,
            duration_ms,
        }
    }

    pub fn status_label(&self) -> &'static str {
        if self.is_error {
            "ERROR"
        } else {
            "SUCCESS"
        }
    }

    pub fn input_tokens(&self) -> u64 {
        self.usage.map(|u| u.input_tokens).unwrap_or(0)
    }

    pub fn output_tokens(&self) -> u64 {
        self.usage.map(|u| u.output_tokens).unwrap_or(0)
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }
}

/// Truncate to at most `max` characters without splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
