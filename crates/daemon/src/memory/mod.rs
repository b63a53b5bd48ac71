// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt assembly from memory, and hot-memory compaction.

mod compactor;
mod context;

pub(crate) use compactor::{CompactionOutcome, Compactor};
pub(crate) use context::load_context;
