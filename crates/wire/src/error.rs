// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

//! Protocol-level errors shared by framing, worker IPC, and client codecs.

/// Frames are capped well above any real tool payload; this guards against a
/// corrupt or malicious length prefix forcing an unbounded allocation.
pub const MAX_FRAME_BYTES: u32 = 64 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("frame of {0} bytes exceeds max frame size {MAX_FRAME_BYTES}")]
    FrameTooLarge(u32),

    #[error("malformed JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed before a complete frame was read")]
    Eof,
}
