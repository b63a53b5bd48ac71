// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for the control socket.
//!
//! Accepts connections in a spawned task and answers exactly one request
//! per connection. Handlers act directly on the shared daemon state; the
//! scheduler sees their effect on its next tick.

mod compact;
mod mutations;

use std::sync::Arc;

use cx_adapters::{ExecutionBackend, ProcessRegistry};
use cx_core::Clock;
use serde_json::json;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::env::ipc_timeout;
use crate::memory::Compactor;
use crate::protocol::{self, Request, Response};
use crate::shared::SharedState;
use crate::vault::Vault;

/// Shared daemon context for all request handlers.
pub(crate) struct ListenCtx<B, C> {
    pub state: SharedState,
    pub registry: ProcessRegistry,
    pub vault: Vault,
    pub compactor: Compactor<B, C>,
}

/// Listener task for accepting socket connections.
pub(crate) struct Listener<B, C> {
    unix: UnixListener,
    ctx: Arc<ListenCtx<B, C>>,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub(crate) enum ConnectionError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),
}

impl<B: ExecutionBackend, C: Clock> Listener<B, C> {
    pub fn new(unix: UnixListener, ctx: Arc<ListenCtx<B, C>>) -> Self {
        Self { unix, ctx }
    }

    /// Accept until `shutdown` fires, spawning a task per connection.
    ///
    /// Dropping the listener on return closes the socket; removing the
    /// socket file is left to shutdown.
    pub async fn run(self, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                result = self.unix.accept() => match result {
                    Ok((stream, _)) => {
                        let ctx = Arc::clone(&self.ctx);
                        tokio::spawn(async move {
                            let (reader, writer) = stream.into_split();
                            if let Err(e) = handle_connection(reader, writer, &ctx).await {
                                log_connection_error(e);
                            }
                        });
                    }
                    Err(e) => error!("Unix accept error: {}", e),
                },
            }
        }
        debug!("listener stopped");
    }
}

fn log_connection_error(e: ConnectionError) {
    match e {
        ConnectionError::Protocol(protocol::ProtocolError::ConnectionClosed) => {
            debug!("Client disconnected")
        }
        ConnectionError::Protocol(protocol::ProtocolError::Timeout) => {
            warn!("Connection timeout")
        }
        _ => error!("Connection error: {}", e),
    }
}

/// Handle a single client connection: one request line, one response line.
///
/// A request that fails to decode or validate is still answered, with the
/// request id when one could be recovered and an empty id otherwise.
pub(crate) async fn handle_connection<R, W, B, C>(
    mut reader: R,
    mut writer: W,
    ctx: &ListenCtx<B, C>,
) -> Result<(), ConnectionError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    B: ExecutionBackend,
    C: Clock,
{
    let (id, request) = protocol::read_request(&mut reader, ipc_timeout()).await?;

    let response = match request {
        Ok(request) => {
            if matches!(request, Request::Status) {
                debug!(id = %id, "received status query");
            } else {
                info!(id = %id, request = ?request, "received request");
            }
            handle_request(request, ctx).await.into_response(id)
        }
        Err(e) => {
            warn!(id = %id, error = %e, "rejected request");
            Response::error(id, e.to_string())
        }
    };

    debug!("Sending response: {:?}", response);
    protocol::write_response(&mut writer, &response, ipc_timeout()).await?;
    Ok(())
}

/// Outcome of one request, before the id is attached.
#[derive(Debug, PartialEq)]
pub(crate) enum Reply {
    Ok(serde_json::Value),
    Error(String),
}

impl Reply {
    pub fn message(message: impl Into<String>) -> Self {
        Reply::Ok(json!({ "message": message.into() }))
    }

    fn into_response(self, id: String) -> Response {
        match self {
            Reply::Ok(result) => Response::ok(id, result),
            Reply::Error(message) => Response::error(id, message),
        }
    }
}

pub(crate) async fn handle_request<B: ExecutionBackend, C: Clock>(
    request: Request,
    ctx: &ListenCtx<B, C>,
) -> Reply {
    match request {
        Request::Status => handle_status(ctx),
        Request::Start { name } => mutations::handle_start(ctx, &name),
        Request::Stop { name } => mutations::handle_stop(ctx, &name),
        Request::Pause { name } => mutations::handle_pause(ctx, &name),
        Request::Resume { name } => mutations::handle_resume(ctx, &name),
        Request::Compact { target } => compact::handle_compact(ctx, target).await,
    }
}

fn handle_status<B, C>(ctx: &ListenCtx<B, C>) -> Reply {
    match serde_json::to_value(ctx.state.snapshot()) {
        Ok(state) => Reply::Ok(state),
        Err(e) => Reply::Error(format!("failed to serialize state: {e}")),
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures;

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
