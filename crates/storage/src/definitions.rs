// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent definition files: `{vault}/cx/agents/{name}.md`.
//!
//! Reads parse the full definition. Writes touch only the frontmatter keys
//! they own and leave the body and any unknown keys as they were.

use std::path::{Path, PathBuf};

use cx_core::frontmatter::{self, FrontmatterError};
use cx_core::{AgentDefinition, AgentStats, AgentStatus, StatsPatch};
use serde_yaml::{Mapping, Value};
use tracing::warn;

use crate::{write_atomic, StorageError, VaultPaths};

#[derive(Debug, Clone)]
pub struct DefinitionStore {
    paths: VaultPaths,
}

impl DefinitionStore {
    pub fn new(paths: VaultPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &VaultPaths {
        &self.paths
    }

    /// All valid definitions, sorted by name.
    ///
    /// A missing agents directory is an empty set. Malformed files are
    /// skipped with a warning.
    pub fn list(&self) -> Result<Vec<AgentDefinition>, StorageError> {
        let dir = self.paths.agents_dir();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::Io { path: dir, source: e }),
        };

        let mut defs = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            match parse_file(&path) {
                Ok(def) if file_stem(&path) == Some(def.name.as_str()) => defs.push(def),
                Ok(def) => warn!(
                    path = %path.display(),
                    name = %def.name,
                    "skipping agent whose name does not match its file name"
                ),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping invalid agent"),
            }
        }
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(defs)
    }

    pub fn read(&self, name: &str) -> Result<AgentDefinition, StorageError> {
        let path = self.paths.agent_file(name);
        if !path.exists() {
            return Err(StorageError::NotFound(name.to_string()));
        }
        parse_file(&path)
    }

    /// Fold one run into the definition's stats.
    pub fn update_stats(&self, name: &str, patch: &StatsPatch) -> Result<AgentStats, StorageError> {
        let mut updated = AgentStats::default();
        self.patch_frontmatter(name, |map| {
            let mut stats: AgentStats =
                serde_yaml::from_value(Value::Mapping(map.clone())).unwrap_or_default();
            stats.apply(patch);
            set(map, "total_runs", serde_yaml::to_value(stats.total_runs)?);
            set(map, "total_cost_usd", serde_yaml::to_value(stats.total_cost_usd)?);
            set(map, "last_run", serde_yaml::to_value(&stats.last_run)?);
            set(map, "last_status", serde_yaml::to_value(&stats.last_status)?);
            updated = stats;
            Ok(())
        })?;
        Ok(updated)
    }

    pub fn set_status(&self, name: &str, status: AgentStatus) -> Result<(), StorageError> {
        self.patch_frontmatter(name, |map| {
            set(map, "status", serde_yaml::to_value(status)?);
            Ok(())
        })
    }

    fn patch_frontmatter(
        &self,
        name: &str,
        f: impl FnOnce(&mut Mapping) -> Result<(), serde_yaml::Error>,
    ) -> Result<(), StorageError> {
        let path = self.paths.agent_file(name);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => return Err(StorageError::Io { path, source: e }),
        };
        let frontmatter_err = |source: FrontmatterError| StorageError::Frontmatter {
            path: path.clone(),
            source,
        };
        let (mut map, body): (Mapping, String) = frontmatter::parse(&raw).map_err(frontmatter_err)?;
        f(&mut map).map_err(|e| frontmatter_err(e.into()))?;
        let rendered = frontmatter::render(&map, &body).map_err(frontmatter_err)?;
        write_atomic(&path, rendered.as_bytes())
    }
}

fn set(map: &mut Mapping, key: &str, value: Value) {
    map.insert(Value::String(key.to_string()), value);
}

fn file_stem(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|s| s.to_str())
}

fn parse_file(path: &Path) -> Result<AgentDefinition, StorageError> {
    let raw = std::fs::read_to_string(path).map_err(StorageError::io(path))?;
    parse_definition(path.to_path_buf(), &raw)
}

fn parse_definition(path: PathBuf, raw: &str) -> Result<AgentDefinition, StorageError> {
    let (mut def, body): (AgentDefinition, String) = frontmatter::parse(raw)
        .map_err(|source| StorageError::Frontmatter { path: path.clone(), source })?;
    def.body = body.trim().to_string();
    def.validate().map_err(|source| StorageError::Definition { path, source })?;
    Ok(def)
}

#[cfg(test)]
#[path = "definitions_tests.rs"]
mod tests;
