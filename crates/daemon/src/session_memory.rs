// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

//! Per-tool session memory: a small key/value store plus a bounded call
//! history, kept in the daemon process and cleared on restart. Writes from
//! concurrent calls to the same tool are last-writer-wins, by design.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

const MAX_KV_ENTRIES: usize = 100;
const MAX_HISTORY_ENTRIES: usize = 50;

#[derive(Debug, Clone)]
struct KvEntry {
    value: Value,
    created_at: Instant,
    expires_at: Option<Instant>,
    access_count: u64,
}

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub function_name: String,
    pub args: Value,
    pub recorded_at: Instant,
}

#[derive(Debug, Default)]
struct ToolMemory {
    kv: HashMap<String, KvEntry>,
    kv_order: VecDeque<String>,
    history: VecDeque<HistoryEntry>,
}

impl ToolMemory {
    fn evict_expired(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .kv
            .iter()
            .filter(|(_, entry)| entry.expires_at.is_some_and(|at| at <= now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in expired {
            self.kv.remove(&key);
            self.kv_order.retain(|k| k != &key);
        }
    }

    fn set(&mut self, key: String, value: Value, ttl: Option<Duration>, now: Instant) {
        self.evict_expired(now);

        if !self.kv.contains_key(&key) {
            self.kv_order.push_back(key.clone());
            while self.kv_order.len() > MAX_KV_ENTRIES {
                if let Some(oldest) = self.kv_order.pop_front() {
                    self.kv.remove(&oldest);
                }
            }
        }

        self.kv.insert(
            key,
            KvEntry { value, created_at: now, expires_at: ttl.map(|d| now + d), access_count: 0 },
        );
    }

    fn get(&mut self, key: &str, now: Instant) -> Option<Value> {
        self.evict_expired(now);
        let entry = self.kv.get_mut(key)?;
        entry.access_count += 1;
        Some(entry.value.clone())
    }

    fn push_history(&mut self, function_name: String, args: Value, now: Instant) {
        self.history.push_back(HistoryEntry { function_name, args, recorded_at: now });
        while self.history.len() > MAX_HISTORY_ENTRIES {
            self.history.pop_front();
        }
    }
}

/// Process-wide session memory, keyed by tool (namespace) name.
#[derive(Default)]
pub struct SessionMemory {
    tools: Mutex<HashMap<String, ToolMemory>>,
}

impl SessionMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, tool: &str, key: &str, value: Value, ttl: Option<Duration>) {
        let now = Instant::now();
        let mut tools = self.tools.lock();
        tools.entry(tool.to_string()).or_default().set(key.to_string(), value, ttl, now);
    }

    pub fn get(&self, tool: &str, key: &str) -> Option<Value> {
        let now = Instant::now();
        let mut tools = self.tools.lock();
        tools.get_mut(tool)?.get(key, now)
    }

    pub fn record_call(&self, tool: &str, function_name: &str, args: Value) {
        let now = Instant::now();
        let mut tools = self.tools.lock();
        tools.entry(tool.to_string()).or_default().push_history(function_name.to_string(), args, now);
    }

    pub fn history_len(&self, tool: &str) -> usize {
        self.tools.lock().get(tool).map(|m| m.history.len()).unwrap_or(0)
    }

    pub fn kv_len(&self, tool: &str) -> usize {
        self.tools.lock().get(tool).map(|m| m.kv.len()).unwrap_or(0)
    }

    /// Serializes the current key/value snapshot for `tool`, for merging
    /// into the next outgoing call's args under `_session_memory`. Inverse
    /// of [`Self::replace_kv_snapshot`]. Returns `Value::Null` if the tool
    /// has no memory yet.
    pub fn snapshot(&self, tool: &str) -> Value {
        let now = Instant::now();
        let mut tools = self.tools.lock();
        let Some(memory) = tools.get_mut(tool) else { return Value::Null };
        memory.evict_expired(now);
        if memory.kv.is_empty() {
            return Value::Null;
        }
        Value::Object(memory.kv.iter().map(|(k, entry)| (k.clone(), entry.value.clone())).collect())
    }

    /// Replaces the whole key/value snapshot for a tool, as reported by a
    /// worker's `memory_update` frame.
    pub fn replace_kv_snapshot(&self, tool: &str, snapshot: Value) {
        let Value::Object(map) = snapshot else { return };
        let now = Instant::now();
        let mut tools = self.tools.lock();
        let memory = tools.entry(tool.to_string()).or_default();
        memory.kv.clear();
        memory.kv_order.clear();
        for (key, value) in map {
            memory.set(key, value, None, now);
        }
    }

    pub fn clear(&self) {
        self.tools.lock().clear();
    }
}

#[cfg(test)]
#[path = "session_memory_tests.rs"]
mod tests;
