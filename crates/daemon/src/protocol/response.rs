// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Response from daemon to CLI: exactly one of `result` or `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn ok(id: impl Into<String>, result: Json) -> Self {
        Self { id: id.into(), result: Some(result), error: None }
    }

    pub fn error(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self { id: id.into(), result: None, error: Some(message.into()) }
    }

    /// `Ok(result)` or `Err(message)`.
    pub fn into_result(self) -> Result<Json, String> {
        match (self.error, self.result) {
            (Some(error), _) => Err(error),
            (None, result) => Ok(result.unwrap_or(Json::Null)),
        }
    }
}
