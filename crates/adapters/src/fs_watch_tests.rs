// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

use super::*;
use std::time::Duration;
use tokio::time::timeout;

#[tokio::test]
async fn watch_reports_new_file_creation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (_watcher, mut events) = FsWatcher::watch(dir.path()).expect("watch");

    let file_path = dir.path().join("alpha.tool.toml");
    std::fs::write(&file_path, "name = \"alpha\"\n").expect("write");

    let event = timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("timed out waiting for fs event")
        .expect("channel closed");

    assert_eq!(event.path, file_path);
    assert!(matches!(event.kind, WatchEventKind::Created | WatchEventKind::Modified));
}

#[tokio::test]
async fn watch_reports_file_removal() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file_path = dir.path().join("beta.tool.toml");
    std::fs::write(&file_path, "name = \"beta\"\n").expect("write");

    let (_watcher, mut events) = FsWatcher::watch(dir.path()).expect("watch");
    std::fs::remove_file(&file_path).expect("remove");

    let mut saw_remove = false;
    for _ in 0..10 {
        let Ok(Some(event)) = timeout(Duration::from_millis(500), events.recv()).await else {
            break;
        };
        if event.kind == WatchEventKind::Removed {
            saw_remove = true;
            break;
        }
    }
    assert!(saw_remove, "expected a Removed event for {file_path:?}");
}
