// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as Json};

use super::ProtocolError;

/// A request line as it appears on the wire, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRequest {
    #[serde(default)]
    pub id: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Json>,
}

/// What `compact` should act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompactTarget {
    Agent(String),
    /// Every agent whose hot memory is over its threshold
    All,
}

/// Validated request from CLI to daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Full daemon state
    Status,
    Start { name: String },
    Stop { name: String },
    Pause { name: String },
    Resume { name: String },
    Compact { target: CompactTarget },
}

impl Request {
    pub fn method(&self) -> &'static str {
        match self {
            Request::Status => "status",
            Request::Start { .. } => "start",
            Request::Stop { .. } => "stop",
            Request::Pause { .. } => "pause",
            Request::Resume { .. } => "resume",
            Request::Compact { .. } => "compact",
        }
    }

    /// Validate a raw request against the closed set of methods.
    pub fn from_raw(raw: &RawRequest) -> Result<Self, ProtocolError> {
        let empty = Map::new();
        let params = match &raw.params {
            None | Some(Json::Null) => &empty,
            Some(Json::Object(map)) => map,
            Some(_) => return Err(ProtocolError::InvalidParams(raw.method.clone())),
        };
        let name = |method: &str| -> Result<String, ProtocolError> {
            params
                .get("name")
                .and_then(Json::as_str)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .ok_or_else(|| ProtocolError::MissingName(method.to_string()))
        };

        match raw.method.as_str() {
            "status" => Ok(Request::Status),
            "start" => Ok(Request::Start { name: name("start")? }),
            "stop" => Ok(Request::Stop { name: name("stop")? }),
            "pause" => Ok(Request::Pause { name: name("pause")? }),
            "resume" => Ok(Request::Resume { name: name("resume")? }),
            "compact" => {
                if params.get("all").and_then(Json::as_bool).unwrap_or(false) {
                    Ok(Request::Compact { target: CompactTarget::All })
                } else {
                    Ok(Request::Compact { target: CompactTarget::Agent(name("compact")?) })
                }
            }
            other => Err(ProtocolError::UnknownMethod(other.to_string())),
        }
    }

    /// Wire form of this request.
    pub fn to_raw(&self, id: impl Into<String>) -> RawRequest {
        let params = match self {
            Request::Status => None,
            Request::Start { name }
            | Request::Stop { name }
            | Request::Pause { name }
            | Request::Resume { name }
            | Request::Compact { target: CompactTarget::Agent(name) } => {
                Some(json!({ "name": name }))
            }
            Request::Compact { target: CompactTarget::All } => Some(json!({ "all": true })),
        };
        RawRequest { id: id.into(), method: self.method().to_string(), params }
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
