// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

//! Compiled dispatch table standing in for dynamic tool loading: each tool
//! function is a plain Rust closure registered by name at worker startup,
//! looked up by the runner on every `call` frame.

use crate::context::ToolContext;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A single tool function. Ordinary, synchronous, may panic — the runner
/// isolates panics per call via `catch_unwind`.
pub type ToolHandler = Arc<dyn Fn(Value, &ToolContext) -> Result<Value, String> + Send + Sync>;

/// Maps function names (unqualified; the daemon adds the tool namespace
/// prefix) to handlers.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    handlers: HashMap<String, ToolHandler>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name`, replacing any existing handler under the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(Value, &ToolContext) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(handler));
        self
    }

    pub fn get(&self, name: &str) -> Option<ToolHandler> {
        self.handlers.get(name).cloned()
    }

    pub fn function_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
