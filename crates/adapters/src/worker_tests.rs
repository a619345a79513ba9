// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

use super::*;

#[tokio::test]
async fn process_adapter_reports_spawn_failure_for_missing_binary() {
    let adapter = ProcessWorkerAdapter;
    let spec = WorkerSpawnSpec {
        namespace: "missing".into(),
        binary_path: PathBuf::from("/nonexistent/path/to/binary-that-does-not-exist"),
        cwd: std::env::temp_dir(),
    };
    let result = adapter.spawn(spec).await;
    assert!(matches!(result, Err(WorkerAdapterError::SpawnFailed(_))));
}
