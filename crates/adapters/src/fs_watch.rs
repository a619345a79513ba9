// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

//! Thin wrapper around the `notify` crate's filesystem watcher, bridged onto
//! a tokio mpsc channel so the daemon's `FileWatcherManager` can `.await` it
//! alongside everything else.

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum FsWatchError {
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),
}

/// A single filesystem change relevant to tool discovery.
#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub path: std::path::PathBuf,
    pub kind: WatchEventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    Created,
    Modified,
    Removed,
}

/// Guards a directory watch started by [`FsWatcher::watch`]. Dropping it
/// stops event delivery, since it owns the underlying `notify::Watcher`.
pub struct FsWatcher {
    _watcher: RecommendedWatcher,
}

impl FsWatcher {
    /// Watches `dir` non-recursively, returning the guard alongside a
    /// channel of create/modify/remove events.
    pub fn watch(dir: &Path) -> Result<(Self, mpsc::UnboundedReceiver<WatchEvent>), FsWatchError> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let Ok(event) = res else { return };
            let Some(kind) = classify(&event.kind) else { return };
            for path in event.paths {
                let _ = tx.send(WatchEvent { path, kind });
            }
        })?;

        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        Ok((Self { _watcher: watcher }, rx))
    }
}

fn classify(kind: &EventKind) -> Option<WatchEventKind> {
    match kind {
        EventKind::Create(_) => Some(WatchEventKind::Created),
        EventKind::Modify(_) => Some(WatchEventKind::Modified),
        EventKind::Remove(_) => Some(WatchEventKind::Removed),
        _ => None,
    }
}

#[cfg(test)]
#[path = "fs_watch_tests.rs"]
mod tests;
