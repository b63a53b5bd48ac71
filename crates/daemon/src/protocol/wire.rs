// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Newline-delimited JSON framing.

use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use super::{RawRequest, Request, Response};

/// Upper bound on a single request or response line
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Invalid JSON")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error("Missing required param 'name' for {0}")]
    MissingName(String),

    #[error("params for {0} must be an object")]
    InvalidParams(String),

    #[error("Line too large: {0} bytes")]
    LineTooLarge(usize),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Timeout")]
    Timeout,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Read one line, without its terminator.
///
/// EOF before any byte is `ConnectionClosed`; EOF after a partial line
/// yields that line.
pub async fn read_line<R: AsyncRead + Unpin>(reader: &mut R) -> Result<String, ProtocolError> {
    let mut buf = Vec::new();
    let mut limited = BufReader::new(reader).take(MAX_LINE_BYTES as u64 + 1);
    let n = limited.read_until(b'\n', &mut buf).await?;
    if n == 0 {
        return Err(ProtocolError::ConnectionClosed);
    }
    if buf.len() > MAX_LINE_BYTES {
        return Err(ProtocolError::LineTooLarge(buf.len()));
    }
    while matches!(buf.last(), Some(b'\n' | b'\r')) {
        buf.pop();
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Write `line` followed by a newline and flush.
pub async fn write_line<W: AsyncWrite + Unpin>(
    writer: &mut W,
    line: &str,
) -> Result<(), ProtocolError> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

/// Decode a request line into its id and validated request.
///
/// The id is recovered whenever the line is a JSON object, so validation
/// errors can still be answered with the caller's id.
pub fn decode_request(line: &str) -> (String, Result<Request, ProtocolError>) {
    let raw: RawRequest = match serde_json::from_str(line) {
        Ok(raw) => raw,
        Err(e) => return (String::new(), Err(ProtocolError::InvalidJson(e))),
    };
    let request = Request::from_raw(&raw);
    (raw.id, request)
}

/// Read a request line with timeout.
pub async fn read_request<R: AsyncRead + Unpin>(
    reader: &mut R,
    timeout: Duration,
) -> Result<(String, Result<Request, ProtocolError>), ProtocolError> {
    let line = tokio::time::timeout(timeout, read_line(reader))
        .await
        .map_err(|_| ProtocolError::Timeout)??;
    Ok(decode_request(&line))
}

/// Write a response line with timeout.
pub async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
    timeout: Duration,
) -> Result<(), ProtocolError> {
    let json = serde_json::to_string(response).map_err(ProtocolError::Serialize)?;
    tokio::time::timeout(timeout, write_line(writer, &json))
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
