// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! YAML frontmatter on markdown documents.
//!
//! ```text
//! ---
//! key: value
//! ---
//! body
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontmatterError {
    #[error("missing frontmatter block")]
    Missing,
    #[error("invalid frontmatter: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Split a document into its raw YAML block and body.
///
/// Returns `None` when the document does not open with a `---` line or the
/// block is never closed.
pub fn split(raw: &str) -> Option<(&str, &str)> {
    let rest = raw.strip_prefix("---\n")?;
    if let Some(body) = rest.strip_prefix("---\n") {
        return Some(("", body));
    }
    if rest == "---" {
        return Some(("", ""));
    }
    let close = rest.find("\n---")?;
    let after = &rest[close + 4..];
    let body = if after.is_empty() {
        ""
    } else {
        after.strip_prefix('\n')?
    };
    Some((&rest[..close + 1], body))
}

/// Parse frontmatter into `T`, returning it with the body.
pub fn parse<T: DeserializeOwned>(raw: &str) -> Result<(T, String), FrontmatterError> {
    let (yaml, body) = split(raw).ok_or(FrontmatterError::Missing)?;
    let data = if yaml.trim().is_empty() {
        serde_yaml::from_str("{}")?
    } else {
        serde_yaml::from_str(yaml)?
    };
    Ok((data, body.to_string()))
}

/// Render `data` as frontmatter followed by `body`.
pub fn render<T: Serialize>(data: &T, body: &str) -> Result<String, FrontmatterError> {
    let mut yaml = serde_yaml::to_string(data)?;
    if !yaml.ends_with('\n') {
        yaml.push('\n');
    }
    Ok(format!("---\n{yaml}---\n{body}"))
}

#[cfg(test)]
#[path = "frontmatter_tests.rs"]
mod tests;
