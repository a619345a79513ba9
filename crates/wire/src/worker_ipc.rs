// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

//! Parent↔child IPC messages exchanged over a worker process's stdin/stdout.
//!
//! Framed with [`crate::framing`]. Parent→child: `call`, `ping`, `shutdown`.
//! Child→parent: `ready`, `result`, `error`, `progress`, `memory_update`,
//! `pong`, `crash`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message sent from the daemon to a worker process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParentMessage {
    Call {
        id: String,
        #[serde(rename = "functionName")]
        function_name: String,
        args: Value,
    },
    Ping {
        id: String,
    },
    Shutdown,
}

/// Message sent from a worker process back to the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChildMessage {
    Ready {
        #[serde(rename = "workerId")]
        worker_id: String,
    },
    Result {
        id: String,
        data: Value,
    },
    Error {
        id: String,
        error: String,
    },
    Progress {
        id: String,
        message: String,
    },
    MemoryUpdate {
        id: String,
        memory: Value,
    },
    Pong {
        id: String,
    },
    Crash {
        error: String,
    },
}

#[cfg(test)]
#[path = "worker_ipc_tests.rs"]
mod tests;
