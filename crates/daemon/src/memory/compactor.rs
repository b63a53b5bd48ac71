// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hot-memory compaction.
//!
//! Everything but the newest entry is summarized by a cheap backend call.
//! The summary and the originals go to a new archive, then hot memory is
//! rewritten as the summary plus the retained entry.

use std::time::Duration;

use cx_adapters::{ExecutionBackend, InvokeRequest};
use cx_core::{memory::entries_text, AgentDefinition, Archive, Clock};
use cx_storage::{MemoryStore, StorageError};
use thiserror::Error;
use tracing::info;

pub(crate) const COMPACTION_BUDGET_USD: f64 = 0.05;
pub(crate) const COMPACTION_TIMEOUT: Duration = Duration::from_secs(120);

const SYSTEM_PROMPT: &str = "You are a memory compaction assistant. \
Summarize concisely while preserving important information.";

#[derive(Debug, Error)]
pub(crate) enum CompactionError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("summarizer failed: {0}")]
    Summarizer(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CompactionOutcome {
    /// Fewer than two entries, nothing to do
    Skipped,
    Compacted { archive: String },
}

#[derive(Clone)]
pub(crate) struct Compactor<B, C> {
    backend: B,
    memory: MemoryStore,
    model: String,
    clock: C,
}

impl<B: ExecutionBackend, C: Clock> Compactor<B, C> {
    pub fn new(backend: B, memory: MemoryStore, model: impl Into<String>, clock: C) -> Self {
        Self { backend, memory, model: model.into(), clock }
    }

    /// Hot memory is over the agent's token threshold.
    pub fn should_compact(&self, def: &AgentDefinition) -> Result<bool, StorageError> {
        let memory = self.memory.read_hot(&def.name)?;
        Ok(memory.token_count() > def.compaction_threshold())
    }

    pub async fn compact_if_needed(
        &self,
        def: &AgentDefinition,
    ) -> Result<CompactionOutcome, CompactionError> {
        if self.should_compact(def)? {
            self.compact(&def.name).await
        } else {
            Ok(CompactionOutcome::Skipped)
        }
    }

    pub async fn compact(&self, agent: &str) -> Result<CompactionOutcome, CompactionError> {
        let memory = self.memory.read_hot(agent)?;
        let Some((summarized, _)) = memory.compaction_split() else {
            return Ok(CompactionOutcome::Skipped);
        };

        let prompt = format!(
            "Summarize the following agent memory entries into a concise summary. \
             Preserve key facts, decisions, and outcomes. Remove redundant details. \
             Output only the summary, no preamble.\n\n{}",
            entries_text(summarized)
        );
        let mut request = InvokeRequest::new(agent, prompt, COMPACTION_TIMEOUT);
        request.model = Some(self.model.clone());
        request.system_prompt = Some(SYSTEM_PROMPT.to_string());
        request.max_budget_usd = Some(COMPACTION_BUDGET_USD);

        let result = self.backend.invoke(request).await;
        if result.is_error {
            return Err(CompactionError::Summarizer(result.result));
        }

        let now = self.clock.now();
        let archive = Archive::new(now, &result.result, summarized);
        self.memory.write_archive(agent, &archive)?;

        // compaction_split succeeded above, so compacted() is Some
        if let Some(compacted) = memory.compacted(&result.result, now) {
            self.memory.write_hot(&compacted)?;
            info!(
                agent,
                archive = %archive.period,
                entries = summarized.len(),
                tokens = compacted.token_count(),
                "compacted memory"
            );
        }
        Ok(CompactionOutcome::Compacted { archive: archive.period })
    }
}

#[cfg(test)]
#[path = "compactor_tests.rs"]
mod tests;
