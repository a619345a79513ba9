// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

//! Wires every subsystem together and drives startup/shutdown in the
//! documented order. This is the only module that knows about all the
//! others; everything else is composable in isolation.

use crate::config::Config;
use crate::connection::ConnectionManager;
use crate::file_watcher::{FileWatcherError, FileWatcherManager};
use crate::health::{HealthMonitor, HealthThresholds};
use crate::http::{self, AppState};
use crate::router::MessageRouter;
use crate::rpc_cache::{RpcCacheError, RpcCacheManager};
use crate::session_memory::SessionMemory;
use crate::worker::WorkerManager;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use wrkd_adapters::worker::WorkerAdapter;
use wrkd_toolspec::ToolFile;

const WORKER_READY_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(5);
const WORKER_RETRY_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Cache(#[from] RpcCacheError),
    #[error(transparent)]
    Watch(#[from] FileWatcherError),
    #[error("failed to bind listener on {addr}: {source}")]
    Bind { addr: SocketAddr, source: std::io::Error },
}

/// Owns every long-lived subsystem and the background tasks wired between
/// them. Constructed once; `start` and `stop` are each idempotent in the
/// sense that calling `stop` on a never-started orchestrator is harmless.
pub struct Orchestrator {
    config: Config,
    rpc_cache: Arc<RpcCacheManager>,
    worker_manager: Arc<WorkerManager>,
    connections: Arc<ConnectionManager>,
    router: Arc<MessageRouter>,
    health: Arc<HealthMonitor>,
    file_watcher: FileWatcherManager,
    watch_tasks: Mutex<Vec<JoinHandle<()>>>,
    listener_task: Mutex<Option<JoinHandle<()>>>,
    health_task: Mutex<Option<JoinHandle<()>>>,
    retry_task: Mutex<Option<JoinHandle<()>>>,
}

impl Orchestrator {
    pub fn new(config: Config, adapter: Arc<dyn WorkerAdapter>) -> Arc<Self> {
        let rpc_cache = Arc::new(RpcCacheManager::new(config.tools_dir.clone(), config.global_tools_dir.clone()));
        let worker_manager = WorkerManager::new(adapter, Arc::new(SessionMemory::new()));
        let connections = ConnectionManager::new(config.max_connections, config.max_frame_bytes);
        let router = MessageRouter::new(Arc::clone(&worker_manager), Arc::clone(&rpc_cache), Arc::clone(&connections));
        let health = HealthMonitor::new(HealthThresholds::default());

        Arc::new(Self {
            config,
            rpc_cache,
            worker_manager,
            connections,
            router,
            health,
            file_watcher: FileWatcherManager::new(),
            watch_tasks: Mutex::new(Vec::new()),
            listener_task: Mutex::new(None),
            health_task: Mutex::new(None),
            retry_task: Mutex::new(None),
        })
    }

    /// Runs the documented start sequence. On success, the daemon is fully
    /// serving traffic on `self.config.port`.
    pub async fn start(self: &Arc<Self>) -> Result<(), OrchestratorError> {
        // 2. Initial cache load (no listeners are up yet, so there is
        // nothing to broadcast the snapshot to; step 3 is implicit).
        let initial_tools = self.rpc_cache.refresh_cache()?;
        info!(count = initial_tools.len(), "initial tool scan complete");

        // 4. Progress sink: targeted delivery to the originating
        // connection rather than a blind broadcast (see DESIGN.md).
        let router = Arc::clone(&self.router);
        self.worker_manager.set_progress_callback(Arc::new(move |namespace, call_id, message| {
            router.on_progress(namespace, call_id, message);
        }));
        self.worker_manager.spawn_background_tasks();

        // 5. Registry-change broadcast.
        let connections = Arc::clone(&self.connections);
        self.rpc_cache.on_cache_refreshed(Arc::new(move |tools| {
            let names: Vec<String> = tools.iter().flat_map(|t| t.functions.iter().cloned()).collect();
            let frame = wrkd_wire::client::ServerMessage::FunctionsUpdated { functions: names };
            if let Ok(json) = serde_json::to_string(&frame) {
                connections.broadcast_to_clients(&json);
            }
        }));

        // 6. File watchers, one per tools directory.
        self.start_watch(self.config.tools_dir.clone())?;
        self.start_watch(self.config.global_tools_dir.clone())?;
        self.connections.spawn_idle_cleanup();

        // 7. Transport.
        self.start_transport().await?;

        // 8. Spawn the initial worker pool.
        for tool in &initial_tools {
            self.spawn_worker(tool).await;
        }

        // 9. Health monitor.
        *self.health_task.lock() = Some(self.health.spawn());

        self.spawn_retry_loop();

        info!(port = self.config.port, "daemon started");
        Ok(())
    }

    /// Background task implementing the crash/backoff retry schedule: a tool
    /// file that failed to start is re-attempted once its backoff window
    /// elapses, without waiting for a new filesystem event, until the file
    /// watcher blocks it after 5 consecutive failures.
    fn spawn_retry_loop(self: &Arc<Self>) {
        let orchestrator = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(WORKER_RETRY_INTERVAL).await;
                orchestrator.retry_blocked_workers().await;
            }
        });
        *self.retry_task.lock() = Some(handle);
    }

    async fn retry_blocked_workers(self: &Arc<Self>) {
        for tool in self.rpc_cache.unique_files() {
            if self.file_watcher.failure_count(&tool.path) == 0 {
                continue;
            }
            if self.file_watcher.is_blocked(&tool.path) {
                continue;
            }
            info!(namespace = %tool.name, "backoff elapsed, retrying worker");
            let _ = self.worker_manager.stop_worker(&tool.name).await;
            self.spawn_worker(&tool).await;
        }
    }

    fn start_watch(self: &Arc<Self>, dir: PathBuf) -> Result<(), OrchestratorError> {
        let (guard, mut batches) = self.file_watcher.start_watching(&dir)?;
        let orchestrator = Arc::clone(self);
        let handle = tokio::spawn(async move {
            // Moved in so the watch stays alive for exactly as long as this
            // task keeps draining its channel.
            let _guard = guard;
            while let Some(batch) = batches.recv().await {
                orchestrator.reload(&batch).await;
            }
        });
        self.watch_tasks.lock().push(handle);
        Ok(())
    }

    async fn start_transport(self: &Arc<Self>) -> Result<(), OrchestratorError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener =
            TcpListener::bind(addr).await.map_err(|source| OrchestratorError::Bind { addr, source })?;

        let state = AppState {
            connections: Arc::clone(&self.connections),
            router: Arc::clone(&self.router),
            rpc_cache: Arc::clone(&self.rpc_cache),
            health: Arc::clone(&self.health),
            worker_manager: Arc::clone(&self.worker_manager),
        };
        let app = http::build_router(state);

        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                warn!(%err, "listener exited");
            }
        });
        *self.listener_task.lock() = Some(handle);
        Ok(())
    }

    /// Reacts to one debounced batch of filesystem changes: rescans both
    /// tools directories, then stops removed workers, starts new ones, and
    /// restarts only the workers whose own directory was touched — the
    /// targeted-restart algorithm, never the whole pool.
    async fn reload(self: &Arc<Self>, changed: &HashSet<PathBuf>) {
        let previous = by_name(self.rpc_cache.unique_files());
        let tools = match self.rpc_cache.refresh_cache() {
            Ok(tools) => tools,
            Err(err) => {
                warn!(%err, "failed to refresh tool cache after a filesystem change");
                return;
            }
        };
        let current = by_name(tools);

        for name in previous.keys() {
            if !current.contains_key(name) {
                info!(namespace = %name, "tool removed, stopping its worker");
                if let Err(err) = self.worker_manager.stop_worker(name).await {
                    warn!(namespace = %name, %err, "failed to stop removed worker");
                }
            }
        }

        for (name, tool) in &current {
            let touched = changed.iter().any(|path| same_tool_dir(path, &tool.path));
            if touched {
                self.file_watcher.reset_file_backoff(&tool.path);
            }

            match previous.get(name) {
                None => {
                    info!(namespace = %name, "new tool discovered");
                    self.spawn_worker(tool).await;
                }
                Some(_) if touched => {
                    info!(namespace = %name, "tool file touched, restarting its worker");
                    let _ = self.worker_manager.stop_worker(name).await;
                    self.spawn_worker(tool).await;
                }
                Some(_) => {}
            }
        }
    }

    async fn spawn_worker(&self, tool: &ToolFile) {
        if self.file_watcher.is_blocked(&tool.path) {
            info!(namespace = %tool.name, "skipping blocked tool file");
            return;
        }
        let cwd = tool.path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
        match self.worker_manager.start_worker(tool.name.clone(), tool.path.clone(), cwd).await {
            Ok(()) => {
                if self.worker_manager.wait_for_ready(&tool.name, WORKER_READY_TIMEOUT).await {
                    self.file_watcher.record_success(&tool.path);
                } else {
                    warn!(namespace = %tool.name, "worker did not become ready in time");
                    self.file_watcher.record_failure(&tool.path);
                }
            }
            Err(err) => {
                warn!(namespace = %tool.name, %err, "failed to start worker");
                self.file_watcher.record_failure(&tool.path);
            }
        }
    }

    /// Runs the reverse of the start sequence: health monitor, workers,
    /// clients, file watchers, then the listener.
    pub async fn stop(&self) {
        if let Some(handle) = self.health_task.lock().take() {
            handle.abort();
        }
        if let Some(handle) = self.retry_task.lock().take() {
            handle.abort();
        }

        self.worker_manager.stop_all_workers(DEFAULT_STOP_GRACE).await;
        self.connections.close_all();

        for handle in self.watch_tasks.lock().drain(..) {
            handle.abort();
        }

        if let Some(handle) = self.listener_task.lock().take() {
            handle.abort();
        }

        info!("daemon stopped");
    }
}

fn by_name(tools: Vec<ToolFile>) -> HashMap<String, ToolFile> {
    tools.into_iter().map(|t| (t.name.clone(), t)).collect()
}

/// A changed path and a tool's binary are treated as the same tool when
/// they share a parent directory — manifests and their compiled worker
/// live side by side, one tool per directory.
fn same_tool_dir(changed: &Path, tool_path: &Path) -> bool {
    changed.parent() == tool_path.parent()
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
