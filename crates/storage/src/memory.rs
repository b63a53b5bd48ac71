// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hot memory (`current.md`) and warm archives (`archive/{period}.md`).

use std::io::Write;

use cx_core::{Archive, HotMemory, MemoryEntry};

use crate::{write_atomic, StorageError, VaultPaths};

#[derive(Debug, Clone)]
pub struct MemoryStore {
    paths: VaultPaths,
}

impl MemoryStore {
    pub fn new(paths: VaultPaths) -> Self {
        Self { paths }
    }

    /// Read hot memory; a missing file is an empty memory.
    pub fn read_hot(&self, agent: &str) -> Result<HotMemory, StorageError> {
        let path = self.paths.hot_memory_file(agent);
        match std::fs::read_to_string(&path) {
            Ok(raw) => Ok(HotMemory::from_markdown(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HotMemory::empty(agent)),
            Err(e) => Err(StorageError::Io { path, source: e }),
        }
    }

    pub fn write_hot(&self, memory: &HotMemory) -> Result<(), StorageError> {
        let path = self.paths.hot_memory_file(memory.agent_name());
        write_atomic(&path, memory.to_markdown()?.as_bytes())
    }

    /// Load, push, persist. Returns the updated memory.
    pub fn append(&self, agent: &str, entry: MemoryEntry) -> Result<HotMemory, StorageError> {
        let mut memory = self.read_hot(agent)?;
        memory.push(entry);
        self.write_hot(&memory)?;
        Ok(memory)
    }

    /// Archive periods for `agent`, oldest first.
    pub fn list_archives(&self, agent: &str) -> Result<Vec<String>, StorageError> {
        let dir = self.paths.archive_dir(agent);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::Io { path: dir, source: e }),
        };
        let mut periods: Vec<String> = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                name.strip_suffix(".md").map(str::to_string)
            })
            .collect();
        periods.sort();
        Ok(periods)
    }

    pub fn read_archive(&self, agent: &str, period: &str) -> Result<String, StorageError> {
        let path = self.paths.archive_file(agent, period);
        std::fs::read_to_string(&path).map_err(StorageError::io(path))
    }

    /// Write a new archive. Archives are immutable: an existing period is an
    /// error, never overwritten.
    pub fn write_archive(&self, agent: &str, archive: &Archive) -> Result<(), StorageError> {
        let dir = self.paths.archive_dir(agent);
        std::fs::create_dir_all(&dir).map_err(StorageError::io(&dir))?;
        let path = self.paths.archive_file(agent, &archive.period);
        let mut file = match std::fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StorageError::ArchiveExists(path))
            }
            Err(e) => return Err(StorageError::Io { path, source: e }),
        };
        file.write_all(archive.content.as_bytes()).map_err(StorageError::io(path))
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
