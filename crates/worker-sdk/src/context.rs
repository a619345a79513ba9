// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

//! Per-call context handed to every tool handler: the reserved args fields
//! the runner extracts on entry (`_client_cwd`, `_session_memory`), a
//! progress emitter, and the call deadline.

use crate::emitter::ProgressEmitter;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Context for a single in-flight call. `_client_cwd` and `_session_memory`
/// are installed from `args` on entry and are cleared (this `ToolContext`
/// dropped) on every exit path, matching the parent's per-call lifetime.
pub struct ToolContext {
    client_cwd: Option<String>,
    memory: Arc<Mutex<Value>>,
    progress: ProgressEmitter,
    deadline: Instant,
}

impl ToolContext {
    pub fn new(client_cwd: Option<String>, initial_memory: Value, progress: ProgressEmitter, deadline: Instant) -> Self {
        Self { client_cwd, memory: Arc::new(Mutex::new(initial_memory)), progress, deadline }
    }

    /// Context with no-op collaborators, for unit-testing handlers directly.
    pub fn for_test() -> Self {
        Self::new(None, Value::Null, ProgressEmitter::for_test(), Instant::now() + std::time::Duration::from_secs(300))
    }

    pub fn client_cwd(&self) -> Option<&str> {
        self.client_cwd.as_deref()
    }

    pub fn memory(&self) -> Value {
        self.memory.lock().clone()
    }

    pub fn set_memory(&self, value: Value) {
        *self.memory.lock() = value;
    }

    pub fn progress(&self) -> &ProgressEmitter {
        &self.progress
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn time_remaining(&self) -> std::time::Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
