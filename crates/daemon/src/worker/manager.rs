// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

use super::WorkerStatus;
use crate::session_memory::SessionMemory;
use parking_lot::Mutex as SyncMutex;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{oneshot, watch, Mutex as AsyncMutex};
use tokio::time::sleep_until;
use tracing::{debug, warn};
use wrkd_adapters::worker::{WorkerAdapter, WorkerAdapterError, WorkerReceiver, WorkerSender, WorkerSpawnSpec};
use wrkd_core::id::CallId;
use wrkd_wire::worker_ipc::{ChildMessage, ParentMessage};

const INITIAL_CALL_TIMEOUT: Duration = Duration::from_secs(30);
const PROGRESS_EXTENSION: Duration = Duration::from_secs(60);
const PING_INTERVAL: Duration = Duration::from_secs(30);
const PONG_TIMEOUT: Duration = Duration::from_secs(10);
const STALE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const STALE_CALL_AGE: Duration = Duration::from_secs(5 * 60);
const STOP_WORKER_GRACE: Duration = Duration::from_millis(500);
const SESSION_MEMORY_KEY: &str = "_session_memory";

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Worker for namespace '{0}' not found.")]
    NotFound(String),
    #[error("Worker for namespace '{0}' is not ready.")]
    NotReady(String),
    #[error("Worker for namespace '{0}' failed to start and requires a fix before retrying.")]
    Failed(String),
    #[error("{0}")]
    Timeout(String),
    #[error("Worker crashed")]
    Crashed,
    #[error("{0}")]
    CallFailed(String),
    #[error("Worker manager shutting down.")]
    ShuttingDown,
    #[error(transparent)]
    Adapter(#[from] WorkerAdapterError),
}

enum CallOutcome {
    Result(Value),
    Error(String),
}

struct PendingCall {
    created_at: Instant,
    deadline_tx: watch::Sender<Instant>,
    responder: Option<oneshot::Sender<CallOutcome>>,
}

struct WorkerEntry {
    binary_path: PathBuf,
    cwd: PathBuf,
    status: WorkerStatus,
    sender: Arc<AsyncMutex<Box<dyn WorkerSender>>>,
    pending_calls: HashMap<CallId, PendingCall>,
    restart_count: u32,
    ever_ready: bool,
    last_pong: Instant,
    awaiting_pong: bool,
    generation: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerManagerStats {
    pub total_workers: usize,
    pub ready_workers: usize,
    pub failed_workers: usize,
    pub pending_calls: usize,
}

/// Invoked with `(namespace, call_id, message)` for every progress frame a
/// worker emits.
type ProgressCallback = dyn Fn(&str, &str, &str) + Send + Sync;

/// Owns every running worker process: spawning, the call protocol, health
/// pings, crash/restart backoff, and shutdown.
pub struct WorkerManager {
    workers: SyncMutex<HashMap<String, WorkerEntry>>,
    adapter: Arc<dyn WorkerAdapter>,
    session_memory: Arc<SessionMemory>,
    progress_cb: SyncMutex<Option<Arc<ProgressCallback>>>,
    shutting_down: AtomicBool,
}

impl WorkerManager {
    pub fn new(adapter: Arc<dyn WorkerAdapter>, session_memory: Arc<SessionMemory>) -> Arc<Self> {
        Arc::new(Self {
            workers: SyncMutex::new(HashMap::new()),
            adapter,
            session_memory,
            progress_cb: SyncMutex::new(None),
            shutting_down: AtomicBool::new(false),
        })
    }

    pub fn set_progress_callback(&self, cb: Arc<ProgressCallback>) {
        *self.progress_cb.lock() = Some(cb);
    }

    /// Spawns the manager's periodic background work (health pings, stale
    /// call sweeps). Call once after construction.
    pub fn spawn_background_tasks(self: &Arc<Self>) {
        let health = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(PING_INTERVAL).await;
                health.run_health_checks().await;
            }
        });

        let sweep = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(STALE_SWEEP_INTERVAL).await;
                sweep.sweep_stale_calls();
            }
        });
    }

    pub fn stats(&self) -> WorkerManagerStats {
        let workers = self.workers.lock();
        let mut stats = WorkerManagerStats { total_workers: workers.len(), ..Default::default() };
        for worker in workers.values() {
            match worker.status {
                WorkerStatus::Ready => stats.ready_workers += 1,
                WorkerStatus::Failed => stats.failed_workers += 1,
                _ => {}
            }
            stats.pending_calls += worker.pending_calls.len();
        }
        stats
    }

    pub fn worker_status(&self, namespace: &str) -> Option<WorkerStatus> {
        self.workers.lock().get(namespace).map(|w| w.status)
    }

    /// Polls until `namespace` reaches `Ready`, returning `false` if it
    /// fails, disappears, or the timeout elapses first.
    pub async fn wait_for_ready(&self, namespace: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            match self.worker_status(namespace) {
                Some(WorkerStatus::Ready) => return true,
                Some(WorkerStatus::Failed) | None => return false,
                _ => {}
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    pub async fn start_worker(
        self: &Arc<Self>,
        namespace: impl Into<String>,
        binary_path: PathBuf,
        cwd: PathBuf,
    ) -> Result<(), WorkerError> {
        let namespace = namespace.into();
        let spec = WorkerSpawnSpec { namespace: namespace.clone(), binary_path: binary_path.clone(), cwd: cwd.clone() };
        let (sender, receiver) = self.adapter.spawn(spec).await?;

        let generation = {
            let mut workers = self.workers.lock();
            let generation = workers.get(&namespace).map(|w| w.generation + 1).unwrap_or(0);
            workers.insert(
                namespace.clone(),
                WorkerEntry {
                    binary_path,
                    cwd,
                    status: WorkerStatus::Starting,
                    sender: Arc::new(AsyncMutex::new(sender)),
                    pending_calls: HashMap::new(),
                    restart_count: workers.get(&namespace).map(|w| w.restart_count).unwrap_or(0),
                    ever_ready: false,
                    last_pong: Instant::now(),
                    awaiting_pong: false,
                    generation,
                },
            );
            generation
        };

        self.spawn_reader(namespace, receiver, generation);
        Ok(())
    }

    fn spawn_reader(self: &Arc<Self>, namespace: String, mut receiver: Box<dyn WorkerReceiver>, generation: u64) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(msg) => manager.handle_child_message(&namespace, generation, msg).await,
                    Err(_) => {
                        manager.handle_worker_exit(&namespace, generation).await;
                        break;
                    }
                }
            }
        });
    }

    async fn handle_child_message(&self, namespace: &str, generation: u64, msg: ChildMessage) {
        match msg {
            ChildMessage::Ready { worker_id } => {
                debug!(namespace, %worker_id, "worker ready");
                let mut workers = self.workers.lock();
                if let Some(worker) = workers.get_mut(namespace).filter(|w| w.generation == generation) {
                    worker.status = WorkerStatus::Ready;
                    worker.ever_ready = true;
                    worker.restart_count = 0;
                    worker.last_pong = Instant::now();
                }
            }
            ChildMessage::Result { id, data } => self.complete_call(namespace, &id, CallOutcome::Result(data)),
            ChildMessage::Error { id, error } => self.complete_call(namespace, &id, CallOutcome::Error(error)),
            ChildMessage::Progress { id, message } => {
                self.extend_call_deadline(namespace, &id);
                if let Some(cb) = self.progress_cb.lock().clone() {
                    cb(namespace, &id, &message);
                }
            }
            ChildMessage::MemoryUpdate { id: _, memory } => {
                self.session_memory.replace_kv_snapshot(namespace, memory);
            }
            ChildMessage::Pong { id: _ } => {
                let mut workers = self.workers.lock();
                if let Some(worker) = workers.get_mut(namespace).filter(|w| w.generation == generation) {
                    worker.last_pong = Instant::now();
                    worker.awaiting_pong = false;
                }
            }
            ChildMessage::Crash { error } => {
                warn!(namespace, %error, "worker reported a crash");
                self.fail_all_pending(namespace, "Worker crashed");
            }
        }
    }

    fn complete_call(&self, namespace: &str, id: &str, outcome: CallOutcome) {
        let mut workers = self.workers.lock();
        let Some(worker) = workers.get_mut(namespace) else { return };
        let call_id = CallId::from_string(id);
        if let Some(mut pending) = worker.pending_calls.remove(&call_id) {
            if let Some(responder) = pending.responder.take() {
                let _ = responder.send(outcome);
            }
        }
    }

    fn extend_call_deadline(&self, namespace: &str, id: &str) {
        let workers = self.workers.lock();
        let Some(worker) = workers.get(namespace) else { return };
        let call_id = CallId::from_string(id);
        if let Some(pending) = worker.pending_calls.get(&call_id) {
            let _ = pending.deadline_tx.send(Instant::now() + PROGRESS_EXTENSION);
        }
    }

    fn fail_all_pending(&self, namespace: &str, message: &str) {
        let mut workers = self.workers.lock();
        let Some(worker) = workers.get_mut(namespace) else { return };
        for (_, mut pending) in worker.pending_calls.drain() {
            if let Some(responder) = pending.responder.take() {
                let _ = responder.send(CallOutcome::Error(message.to_string()));
            }
        }
    }

    async fn handle_worker_exit(self: &Arc<Self>, namespace: &str, generation: u64) {
        self.fail_all_pending(namespace, "Worker crashed");

        let (ever_ready, restart_count, binary_path, cwd) = {
            let mut workers = self.workers.lock();
            let Some(worker) = workers.get_mut(namespace).filter(|w| w.generation == generation) else {
                return;
            };
            let ever_ready = worker.ever_ready;
            let restart_count = worker.restart_count;
            worker.status = if ever_ready { WorkerStatus::Crashed } else { WorkerStatus::Failed };
            (ever_ready, restart_count, worker.binary_path.clone(), worker.cwd.clone())
        };

        if !ever_ready || self.shutting_down.load(Ordering::SeqCst) {
            return;
        }

        let backoff_ms = (1000u64.saturating_mul(1u64 << restart_count.min(20))).min(30_000);
        let namespace = namespace.to_string();
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            if manager.shutting_down.load(Ordering::SeqCst) {
                return;
            }
            {
                let mut workers = manager.workers.lock();
                if let Some(worker) = workers.get_mut(&namespace) {
                    worker.restart_count = restart_count + 1;
                }
            }
            if let Err(err) = manager.start_worker(namespace.clone(), binary_path, cwd).await {
                warn!(namespace, %err, "failed to restart worker");
            }
        });
    }

    async fn run_health_checks(&self) {
        let ready: Vec<(String, Arc<AsyncMutex<Box<dyn WorkerSender>>>, Instant, bool)> = {
            let mut workers = self.workers.lock();
            workers
                .iter_mut()
                .filter(|(_, w)| w.status == WorkerStatus::Ready)
                .map(|(ns, w)| {
                    let was_awaiting = w.awaiting_pong;
                    w.awaiting_pong = true;
                    (ns.clone(), Arc::clone(&w.sender), w.last_pong, was_awaiting)
                })
                .collect()
        };

        for (namespace, sender, last_pong, was_awaiting) in ready {
            if was_awaiting && last_pong.elapsed() > PONG_TIMEOUT {
                warn!(namespace, "worker missed pong, treating as crashed");
                let mut sender = sender.lock().await;
                let _ = sender.kill().await;
                continue;
            }
            let id = CallId::new().to_string();
            let mut sender = sender.lock().await;
            let _ = sender.send(&ParentMessage::Ping { id }).await;
        }
    }

    fn sweep_stale_calls(&self) {
        let now = Instant::now();
        let mut workers = self.workers.lock();
        for worker in workers.values_mut() {
            let stale: Vec<CallId> = worker
                .pending_calls
                .iter()
                .filter(|(_, pending)| now.saturating_duration_since(pending.created_at) > STALE_CALL_AGE)
                .map(|(id, _)| *id)
                .collect();
            for call_id in stale {
                if let Some(mut pending) = worker.pending_calls.remove(&call_id) {
                    if let Some(responder) = pending.responder.take() {
                        let _ = responder.send(CallOutcome::Error("Worker call exceeded maximum execution time".into()));
                    }
                }
            }
        }
    }

    pub async fn call_function(&self, namespace: &str, function_name: &str, args: Value) -> Result<Value, WorkerError> {
        self.call_function_tracked(namespace, function_name, args, |_| {}).await
    }

    /// Same as [`Self::call_function`], but invokes `on_call_id` with the
    /// internal worker-IPC call id as soon as it's assigned (before the
    /// call is sent), so a caller can correlate later `progress` callback
    /// invocations with this particular call.
    pub async fn call_function_tracked(
        &self,
        namespace: &str,
        function_name: &str,
        args: Value,
        on_call_id: impl FnOnce(&str),
    ) -> Result<Value, WorkerError> {
        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(WorkerError::ShuttingDown);
        }

        let args = inject_session_memory(args, self.session_memory.snapshot(namespace));

        let sender = {
            let mut workers = self.workers.lock();
            let worker = workers.get_mut(namespace).ok_or_else(|| WorkerError::NotFound(namespace.to_string()))?;
            match worker.status {
                WorkerStatus::Ready => {}
                WorkerStatus::Failed => return Err(WorkerError::Failed(namespace.to_string())),
                WorkerStatus::Starting | WorkerStatus::Crashed => {
                    return Err(WorkerError::NotReady(namespace.to_string()))
                }
            }
            Arc::clone(&worker.sender)
        };

        let call_id = CallId::new();
        on_call_id(call_id.as_str());
        let (result_tx, result_rx) = oneshot::channel();
        let created_at = Instant::now();
        let (deadline_tx, deadline_rx) = watch::channel(created_at + INITIAL_CALL_TIMEOUT);

        {
            let mut workers = self.workers.lock();
            if let Some(worker) = workers.get_mut(namespace) {
                worker
                    .pending_calls
                    .insert(call_id, PendingCall { created_at, deadline_tx, responder: Some(result_tx) });
            }
        }

        let send_result = {
            let mut sender = sender.lock().await;
            sender
                .send(&ParentMessage::Call { id: call_id.to_string(), function_name: function_name.to_string(), args })
                .await
        };
        if let Err(err) = send_result {
            self.remove_pending(namespace, &call_id);
            return Err(err.into());
        }

        tokio::select! {
            outcome = result_rx => {
                match outcome {
                    Ok(CallOutcome::Result(value)) => Ok(value),
                    Ok(CallOutcome::Error(message)) => Err(WorkerError::CallFailed(message)),
                    Err(_) => Err(WorkerError::Crashed),
                }
            }
            _ = wait_for_deadline(deadline_rx) => {
                self.remove_pending(namespace, &call_id);
                let elapsed = created_at.elapsed().as_secs();
                Err(WorkerError::Timeout(format!(
                    "RPC call timeout: {namespace}.{function_name} ({elapsed} seconds)"
                )))
            }
        }
    }

    fn remove_pending(&self, namespace: &str, call_id: &CallId) {
        let mut workers = self.workers.lock();
        if let Some(worker) = workers.get_mut(namespace) {
            worker.pending_calls.remove(call_id);
        }
    }

    /// Sends `shutdown`, waits briefly for the process to exit, then kills
    /// it if it hasn't.
    pub async fn stop_worker(&self, namespace: &str) -> Result<(), WorkerError> {
        let sender = {
            let mut workers = self.workers.lock();
            workers.remove(namespace).map(|w| w.sender)
        };
        let Some(sender) = sender else {
            return Err(WorkerError::NotFound(namespace.to_string()));
        };
        {
            let mut sender = sender.lock().await;
            let _ = sender.send(&ParentMessage::Shutdown).await;
        }
        tokio::time::sleep(STOP_WORKER_GRACE).await;
        let mut sender = sender.lock().await;
        let _ = sender.kill().await;
        Ok(())
    }

    pub async fn stop_all_workers(&self, grace: Duration) {
        self.shutting_down.store(true, Ordering::SeqCst);

        let namespaces: Vec<String> = self.workers.lock().keys().cloned().collect();
        for namespace in &namespaces {
            self.fail_all_pending(namespace, "Worker manager shutting down.");
        }

        let senders: Vec<Arc<AsyncMutex<Box<dyn WorkerSender>>>> = {
            let workers = self.workers.lock();
            workers.values().map(|w| Arc::clone(&w.sender)).collect()
        };
        for sender in &senders {
            let mut sender = sender.lock().await;
            let _ = sender.send(&ParentMessage::Shutdown).await;
        }

        tokio::time::sleep(grace).await;

        for sender in &senders {
            let mut sender = sender.lock().await;
            let _ = sender.kill().await;
        }

        self.workers.lock().clear();
    }
}

/// Merges a session-memory snapshot into outgoing call args under the
/// reserved key the worker SDK extracts on entry. A no-op if there's no
/// snapshot yet or `args` isn't a JSON object.
fn inject_session_memory(mut args: Value, snapshot: Value) -> Value {
    if snapshot.is_null() {
        return args;
    }
    if let Some(obj) = args.as_object_mut() {
        obj.insert(SESSION_MEMORY_KEY.to_string(), snapshot);
    }
    args
}

async fn wait_for_deadline(mut deadline_rx: watch::Receiver<Instant>) {
    loop {
        let deadline = *deadline_rx.borrow();
        tokio::select! {
            _ = sleep_until(deadline.into()) => return,
            changed = deadline_rx.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
