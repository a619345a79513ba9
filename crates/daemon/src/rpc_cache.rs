// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

//! Discovers tool manifests under the project and global tools directories
//! and keeps an in-memory, atomically-swapped snapshot of the merged
//! overlay (project tools shadow global tools of the same name).

use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use wrkd_toolspec::{merge, scan_dir, ToolFile, ToolspecError};

#[derive(Debug, Error)]
pub enum RpcCacheError {
    #[error(transparent)]
    Scan(#[from] ToolspecError),
}

type RefreshCallback = dyn Fn(&[ToolFile]) + Send + Sync;

/// Owns the merged view of every discovered tool and refreshes it on
/// demand (typically in response to a file-watcher event).
pub struct RpcCacheManager {
    project_dir: PathBuf,
    global_dir: PathBuf,
    tools: RwLock<Vec<ToolFile>>,
    on_refresh: RwLock<Option<Arc<RefreshCallback>>>,
}

impl RpcCacheManager {
    pub fn new(project_dir: PathBuf, global_dir: PathBuf) -> Self {
        Self { project_dir, global_dir, tools: RwLock::new(Vec::new()), on_refresh: RwLock::new(None) }
    }

    pub fn on_cache_refreshed(&self, cb: Arc<RefreshCallback>) {
        *self.on_refresh.write() = Some(cb);
    }

    /// Rescans both tools directories and atomically replaces the cached
    /// overlay. Returns the new set of tools.
    pub fn refresh_cache(&self) -> Result<Vec<ToolFile>, RpcCacheError> {
        let project = scan_dir(&self.project_dir)?;
        let global = scan_dir(&self.global_dir)?;
        let merged = merge(project, global);
        let tools: Vec<ToolFile> = merged.into_values().collect();

        info!(count = tools.len(), "refreshed tool cache");
        *self.tools.write() = tools.clone();

        if let Some(cb) = self.on_refresh.read().clone() {
            cb(&tools);
        }
        Ok(tools)
    }

    pub fn unique_files(&self) -> Vec<ToolFile> {
        self.tools.read().clone()
    }

    pub fn function_names(&self) -> Vec<String> {
        let tools = self.tools.read();
        let mut names: Vec<String> = tools.iter().flat_map(|t| t.functions.iter().cloned()).collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn find(&self, name: &str) -> Option<ToolFile> {
        self.tools.read().iter().find(|t| t.name == name).cloned()
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn global_dir(&self) -> &Path {
        &self.global_dir
    }
}

#[cfg(test)]
#[path = "rpc_cache_tests.rs"]
mod tests;
