// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `KEY=VALUE` secret files passed as environment to child processes.

use std::collections::BTreeMap;
use std::path::Path;

use crate::StorageError;

/// Parse dotenv-style text. Blank lines and `#` comments are ignored and a
/// single pair of surrounding quotes is stripped from values.
pub fn parse_env(raw: &str) -> BTreeMap<String, String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), unquote(value.trim()).to_string()))
        })
        .collect()
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(quote).and_then(|v| v.strip_suffix(quote)) {
            return inner;
        }
    }
    value
}

/// `global.env` overlaid by `{env_ref}.env`. Missing files contribute nothing.
pub fn load_secrets(
    secrets_dir: &Path,
    env_ref: Option<&str>,
) -> Result<BTreeMap<String, String>, StorageError> {
    let mut env = read_env_file(&secrets_dir.join("global.env"))?;
    if let Some(env_ref) = env_ref.filter(|r| !r.is_empty()) {
        env.extend(read_env_file(&secrets_dir.join(format!("{env_ref}.env")))?);
    }
    Ok(env)
}

fn read_env_file(path: &Path) -> Result<BTreeMap<String, String>, StorageError> {
    match std::fs::read_to_string(path) {
        Ok(raw) => Ok(parse_env(&raw)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(StorageError::Io { path: path.to_path_buf(), source: e }),
    }
}

#[cfg(test)]
#[path = "secrets_tests.rs"]
mod tests;
