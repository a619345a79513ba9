// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

//! In-memory [`WorkerAdapter`] for exercising `WorkerManager` without
//! spawning real processes.
//!
//! The fake's receive half blocks on an mpsc channel rather than draining
//! a fixed queue, so a worker that has said everything scripted for it
//! behaves like a real, still-running process that simply has nothing to
//! say yet — it does not look crashed just because its script ran dry.

use crate::worker::{WorkerAdapter, WorkerAdapterError, WorkerReceiver, WorkerSender, WorkerSpawnSpec};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use wrkd_wire::worker_ipc::{ChildMessage, ParentMessage};

#[derive(Default)]
struct Shared {
    received: Vec<ParentMessage>,
    killed: bool,
}

/// Records every spawn and lets each spawned worker be scripted
/// independently by namespace.
#[derive(Clone, Default)]
pub struct FakeWorkerAdapter {
    spawned: Arc<Mutex<Vec<WorkerSpawnSpec>>>,
    scripts: Arc<Mutex<HashMap<String, Vec<ChildMessage>>>>,
    fail_spawn: Arc<Mutex<std::collections::HashSet<String>>>,
    /// Kept so callers that only hold the adapter (not the sender/receiver
    /// halves handed to the thing under test) can still inspect a spawned
    /// worker, or push it more messages, by namespace.
    outgoing_tx: Arc<Mutex<HashMap<String, mpsc::UnboundedSender<ChildMessage>>>>,
    shared: Arc<Mutex<HashMap<String, Arc<Mutex<Shared>>>>>,
}

impl FakeWorkerAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the messages a worker for `namespace` will emit, in order, the
    /// first being consumed by the worker's initial `recv()` call.
    pub fn script(&self, namespace: impl Into<String>, messages: Vec<ChildMessage>) {
        self.scripts.lock().insert(namespace.into(), messages);
    }

    /// Make the next spawn for `namespace` fail instead of succeeding.
    pub fn fail_next_spawn(&self, namespace: impl Into<String>) {
        self.fail_spawn.lock().insert(namespace.into());
    }

    pub fn spawned_namespaces(&self) -> Vec<String> {
        self.spawned.lock().iter().map(|s| s.namespace.clone()).collect()
    }

    /// Messages sent to the most recently spawned worker for `namespace`.
    pub fn sent_to(&self, namespace: &str) -> Vec<ParentMessage> {
        self.shared.lock().get(namespace).map(|s| s.lock().received.clone()).unwrap_or_default()
    }

    pub fn is_killed(&self, namespace: &str) -> bool {
        self.shared.lock().get(namespace).map(|s| s.lock().killed).unwrap_or(false)
    }

    /// Push an additional message the named worker will emit on its next
    /// `recv()`, after it has already been spawned.
    pub fn push_message(&self, namespace: &str, msg: ChildMessage) {
        if let Some(tx) = self.outgoing_tx.lock().get(namespace) {
            let _ = tx.send(msg);
        }
    }

    /// Closes the outgoing channel for `namespace`, making its next `recv()`
    /// return `Exited` as if the process had died.
    pub fn simulate_exit(&self, namespace: &str) {
        self.outgoing_tx.lock().remove(namespace);
    }
}

#[async_trait]
impl WorkerAdapter for FakeWorkerAdapter {
    async fn spawn(
        &self,
        spec: WorkerSpawnSpec,
    ) -> Result<(Box<dyn WorkerSender>, Box<dyn WorkerReceiver>), WorkerAdapterError> {
        if self.fail_spawn.lock().remove(&spec.namespace) {
            return Err(WorkerAdapterError::SpawnFailed(format!(
                "scripted failure for {}",
                spec.namespace
            )));
        }
        let scripted = self.scripts.lock().remove(&spec.namespace).unwrap_or_default();
        let (tx, rx) = mpsc::unbounded_channel();
        for msg in scripted {
            let _ = tx.send(msg);
        }
        self.outgoing_tx.lock().insert(spec.namespace.clone(), tx);

        let shared = Arc::new(Mutex::new(Shared::default()));
        self.shared.lock().insert(spec.namespace.clone(), shared.clone());
        self.spawned.lock().push(spec);

        Ok((Box::new(FakeWorkerSender { shared }), Box::new(FakeWorkerReceiver { rx })))
    }
}

pub struct FakeWorkerSender {
    shared: Arc<Mutex<Shared>>,
}

#[async_trait]
impl WorkerSender for FakeWorkerSender {
    async fn send(&mut self, msg: &ParentMessage) -> Result<(), WorkerAdapterError> {
        self.shared.lock().received.push(msg.clone());
        Ok(())
    }

    async fn kill(&mut self) -> Result<(), WorkerAdapterError> {
        self.shared.lock().killed = true;
        Ok(())
    }

    fn pid(&self) -> Option<u32> {
        None
    }
}

pub struct FakeWorkerReceiver {
    rx: mpsc::UnboundedReceiver<ChildMessage>,
}

#[async_trait]
impl WorkerReceiver for FakeWorkerReceiver {
    async fn recv(&mut self) -> Result<ChildMessage, WorkerAdapterError> {
        self.rx.recv().await.ok_or(WorkerAdapterError::Exited)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
