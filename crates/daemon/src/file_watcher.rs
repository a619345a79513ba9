// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

//! Watches the tools directories for changes, debounces bursts of events
//! into coalesced batches, and tracks a per-file failure backoff so a
//! repeatedly-broken tool file doesn't get reloaded in a hot loop.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc;
use wrkd_adapters::fs_watch::{FsWatchError, FsWatcher};

const DEBOUNCE: Duration = Duration::from_millis(200);
const MAX_FAILURES: u32 = 5;

#[derive(Debug, Error)]
pub enum FileWatcherError {
    #[error(transparent)]
    Watch(#[from] FsWatchError),
}

#[derive(Debug, Clone)]
struct FailedFileInfo {
    fail_count: u32,
    last_attempt: Instant,
}

impl FailedFileInfo {
    fn backoff(&self) -> Duration {
        let secs = 1u64.saturating_mul(1u64 << (self.fail_count.saturating_sub(1)).min(20));
        Duration::from_secs(secs).min(Duration::from_secs(60))
    }

    fn blocked(&self, now: Instant) -> bool {
        self.fail_count >= MAX_FAILURES || now.duration_since(self.last_attempt) < self.backoff()
    }
}

/// Watches one or more directories and emits debounced, deduplicated
/// batches of changed paths on `batches()`.
pub struct FileWatcherManager {
    failures: Mutex<HashMap<PathBuf, FailedFileInfo>>,
}

impl Default for FileWatcherManager {
    fn default() -> Self {
        Self::new()
    }
}

impl FileWatcherManager {
    pub fn new() -> Self {
        Self { failures: Mutex::new(HashMap::new()) }
    }

    /// Starts watching `dir`, returning the watch guard (keep it alive for
    /// as long as watching should continue) and a receiver of debounced
    /// batches of changed paths.
    pub fn start_watching(
        &self,
        dir: &Path,
    ) -> Result<(FsWatcher, mpsc::UnboundedReceiver<HashSet<PathBuf>>), FileWatcherError> {
        let (watcher, events) = FsWatcher::watch(dir)?;
        Ok((watcher, debounce(events)))
    }

    /// Records a reload failure for `path`. Returns whether the file is now
    /// blocked (5 consecutive failures) until manually edited.
    pub fn record_failure(&self, path: &Path) -> bool {
        let now = Instant::now();
        let mut failures = self.failures.lock();
        let entry = failures.entry(path.to_path_buf()).or_insert(FailedFileInfo { fail_count: 0, last_attempt: now });
        entry.fail_count += 1;
        entry.last_attempt = now;
        entry.fail_count >= MAX_FAILURES
    }

    pub fn record_success(&self, path: &Path) {
        self.failures.lock().remove(path);
    }

    /// Whether `path` is currently blocked from reload attempts, either by
    /// being past the failure limit or still inside its backoff window.
    pub fn is_blocked(&self, path: &Path) -> bool {
        let now = Instant::now();
        self.failures.lock().get(path).is_some_and(|info| info.blocked(now))
    }

    /// Clears backoff state for `path`, called when the file is observed to
    /// change again (a manual edit after being blocked).
    pub fn reset_file_backoff(&self, path: &Path) {
        self.failures.lock().remove(path);
    }

    pub fn failure_count(&self, path: &Path) -> u32 {
        self.failures.lock().get(path).map(|i| i.fail_count).unwrap_or(0)
    }
}

fn debounce(mut events: mpsc::UnboundedReceiver<wrkd_adapters::fs_watch::WatchEvent>) -> mpsc::UnboundedReceiver<HashSet<PathBuf>> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut pending: HashSet<PathBuf> = HashSet::new();
        loop {
            let first = events.recv().await;
            let Some(first) = first else { break };
            pending.insert(first.path);

            loop {
                tokio::select! {
                    biased;
                    event = events.recv() => {
                        match event {
                            Some(event) => { pending.insert(event.path); }
                            None => {
                                if !pending.is_empty() {
                                    let _ = tx.send(std::mem::take(&mut pending));
                                }
                                return;
                            }
                        }
                    }
                    _ = tokio::time::sleep(DEBOUNCE) => break,
                }
            }

            if !pending.is_empty() && tx.send(std::mem::take(&mut pending)).is_err() {
                return;
            }
        }
    });
    rx
}

#[cfg(test)]
#[path = "file_watcher_tests.rs"]
mod tests;
