// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unix socket client for the cx daemon.

use std::path::{Path, PathBuf};
use std::time::Duration;

use cx_core::DaemonState;
use cx_daemon::protocol::{read_line, write_line};
use cx_daemon::{CompactTarget, ProtocolError, Request, Response};
use serde_json::Value as Json;
use thiserror::Error;
use tokio::net::UnixStream;

/// Compaction calls the summarizer; give it far longer than a status call.
const COMPACT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon not running")]
    NotRunning,

    #[error("daemon did not respond within {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Daemon(String),

    #[error("unexpected response: {0}")]
    Unexpected(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    pub fn is_not_running(&self) -> bool {
        matches!(self, ClientError::NotRunning)
    }
}

pub struct DaemonClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl DaemonClient {
    pub fn new(socket_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self { socket_path: socket_path.into(), timeout }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// One request per connection: write a line, read a line.
    pub async fn send(&self, request: &Request) -> Result<Json, ClientError> {
        let timeout = match request {
            Request::Compact { .. } => self.timeout.max(COMPACT_TIMEOUT),
            _ => self.timeout,
        };
        let stream = UnixStream::connect(&self.socket_path).await.map_err(connect_error)?;
        let id = uuid::Uuid::new_v4().to_string();
        let raw = request.to_raw(&id);

        let exchange = async {
            let (mut reader, mut writer) = stream.into_split();
            let line = serde_json::to_string(&raw).map_err(ProtocolError::Serialize)?;
            write_line(&mut writer, &line).await?;
            let reply = read_line(&mut reader).await?;
            serde_json::from_str::<Response>(&reply).map_err(ProtocolError::InvalidJson)
        };
        let response = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| ClientError::Timeout(timeout))??;

        if response.id != id {
            return Err(ClientError::Unexpected(format!(
                "response id {} does not match request {}",
                response.id, id
            )));
        }
        response.into_result().map_err(ClientError::Daemon)
    }

    pub async fn status(&self) -> Result<DaemonState, ClientError> {
        let result = self.send(&Request::Status).await?;
        serde_json::from_value(result).map_err(|e| ClientError::Unexpected(e.to_string()))
    }

    /// Send a start/stop/pause/resume and return the daemon's message.
    pub async fn mutate(&self, request: &Request) -> Result<String, ClientError> {
        let result = self.send(request).await?;
        result
            .get("message")
            .and_then(Json::as_str)
            .map(str::to_string)
            .ok_or_else(|| ClientError::Unexpected(result.to_string()))
    }

    /// Names of the agents that were compacted.
    pub async fn compact(&self, target: CompactTarget) -> Result<Vec<String>, ClientError> {
        let result = self.send(&Request::Compact { target }).await?;
        let compacted = result.get("compacted").cloned().unwrap_or(Json::Null);
        serde_json::from_value(compacted).map_err(|e| ClientError::Unexpected(e.to_string()))
    }
}

fn connect_error(e: std::io::Error) -> ClientError {
    match e.kind() {
        std::io::ErrorKind::NotFound | std::io::ErrorKind::ConnectionRefused => {
            ClientError::NotRunning
        }
        _ => ClientError::Io(e),
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
