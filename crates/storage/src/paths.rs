// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layout of the cx vault on disk.

use std::path::{Path, PathBuf};

/// Paths inside a vault. Everything cx owns lives under `{vault}/cx/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultPaths {
    root: PathBuf,
}

impl VaultPaths {
    pub fn new(vault: impl AsRef<Path>) -> Self {
        Self { root: vault.as_ref().join("cx") }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn agents_dir(&self) -> PathBuf {
        self.root.join("agents")
    }

    pub fn agent_file(&self, name: &str) -> PathBuf {
        self.agents_dir().join(format!("{name}.md"))
    }

    pub fn watchers_dir(&self) -> PathBuf {
        self.root.join("watchers")
    }

    pub fn memory_dir(&self, name: &str) -> PathBuf {
        self.root.join("memory").join(name)
    }

    pub fn hot_memory_file(&self, name: &str) -> PathBuf {
        self.memory_dir(name).join("current.md")
    }

    pub fn archive_dir(&self, name: &str) -> PathBuf {
        self.memory_dir(name).join("archive")
    }

    pub fn archive_file(&self, name: &str, period: &str) -> PathBuf {
        self.archive_dir(name).join(format!("{period}.md"))
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.root.join("runs")
    }

    pub fn costs_file(&self) -> PathBuf {
        self.root.join("costs.md")
    }

    pub fn secrets_dir(&self) -> PathBuf {
        self.root.join("secrets")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_rooted_under_cx() {
        let paths = VaultPaths::new("/vault");
        assert_eq!(paths.agent_file("digest"), PathBuf::from("/vault/cx/agents/digest.md"));
        assert_eq!(
            paths.hot_memory_file("digest"),
            PathBuf::from("/vault/cx/memory/digest/current.md")
        );
        assert_eq!(
            paths.archive_file("digest", "2026-01-1"),
            PathBuf::from("/vault/cx/memory/digest/archive/2026-01-1.md")
        );
        assert_eq!(paths.costs_file(), PathBuf::from("/vault/cx/costs.md"));
        assert_eq!(paths.watchers_dir(), PathBuf::from("/vault/cx/watchers"));
    }
}
