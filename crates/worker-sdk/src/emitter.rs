// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

//! Progress emitter handed to a tool handler so it can stream progress
//! during execution. Messages are pushed onto the runner's single outgoing
//! channel so they reach stdout in FIFO order relative to other frames for
//! the same call.

use tokio::sync::mpsc;
use wrkd_wire::worker_ipc::ChildMessage;

#[derive(Clone)]
pub struct ProgressEmitter {
    call_id: String,
    tx: Option<mpsc::UnboundedSender<ChildMessage>>,
}

impl ProgressEmitter {
    pub(crate) fn new(call_id: String, tx: mpsc::UnboundedSender<ChildMessage>) -> Self {
        Self { call_id, tx: Some(tx) }
    }

    /// An emitter with nowhere to send; `emit` becomes a no-op. Used when
    /// unit-testing handlers outside the runner's IPC loop.
    pub fn for_test() -> Self {
        Self { call_id: "test".into(), tx: None }
    }

    /// Emits a progress message for this call. Silently dropped if the
    /// writer task has already gone away (e.g. the call outlived shutdown).
    pub fn emit(&self, message: impl Into<String>) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(ChildMessage::Progress { id: self.call_id.clone(), message: message.into() });
        }
    }
}

#[cfg(test)]
#[path = "emitter_tests.rs"]
mod tests;
