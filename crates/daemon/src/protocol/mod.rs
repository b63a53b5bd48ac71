// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC Protocol for daemon communication.
//!
//! Wire format: one JSON object per line. A connection carries exactly one
//! request line and one response line, then closes.

mod request;
mod response;
mod wire;

pub use request::{CompactTarget, RawRequest, Request};
pub use response::Response;
pub use wire::{decode_request, read_line, read_request, write_line, write_response, ProtocolError};
pub use wire::MAX_LINE_BYTES;
