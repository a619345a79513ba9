// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

use super::*;
use crate::session_memory::SessionMemory;
use serde_json::{json, Value};
use std::path::PathBuf;
use wrkd_adapters::fake::FakeWorkerAdapter;
use wrkd_wire::worker_ipc::{ChildMessage, ParentMessage};

fn write_manifest(dir: &std::path::Path, file_name: &str, name: &str) {
    std::fs::write(dir.join(file_name), format!("name = \"{name}\"\nentry_point = \"{name}-bin\"\nfunctions = [\"run\"]\n"))
        .expect("write manifest");
}

fn router_with(adapter: FakeWorkerAdapter) -> (Arc<MessageRouter>, Arc<WorkerManager>, Arc<ConnectionManager>) {
    let worker_manager = WorkerManager::new(Arc::new(adapter), Arc::new(SessionMemory::new()));
    let rpc_cache = Arc::new(RpcCacheManager::new(PathBuf::from("/does/not/exist"), PathBuf::from("/also/missing")));
    let connections = ConnectionManager::with_defaults();
    let router = MessageRouter::new(Arc::clone(&worker_manager), rpc_cache, Arc::clone(&connections));
    (router, worker_manager, connections)
}

fn request(id: &str, method: &str, args: Value) -> ClientRequest {
    ClientRequest { id: Some(id.to_string()), method: Some(method.to_string()), args: Some(args), script: None }
}

#[tokio::test]
async fn route_against_unknown_namespace_wraps_the_error() {
    let (router, _worker_manager, connections) = router_with(FakeWorkerAdapter::new());
    let (conn_id, _rx) = connections.handle_open().expect("accepted");

    let response = router.route(conn_id, request("1", "ghost.run", json!({}))).await;
    assert!(matches!(response, ServerMessage::Error { id, .. } if id == "1"));
}

#[tokio::test]
async fn route_dispatches_to_the_worker_and_returns_the_result() {
    let adapter = FakeWorkerAdapter::new();
    adapter.script("alpha", vec![ChildMessage::Ready { worker_id: "work-1".into() }]);
    let (router, worker_manager, connections) = router_with(adapter.clone());
    let (conn_id, _rx) = connections.handle_open().expect("accepted");
    worker_manager.start_worker("alpha", PathBuf::from("alpha"), std::env::temp_dir()).await.expect("start");
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let router2 = Arc::clone(&router);
    let call = tokio::spawn(async move { router2.route(conn_id, request("req-1", "alpha.run", json!({"x": 1}))).await });
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let sent = adapter.sent_to("alpha");
    let ParentMessage::Call { id, .. } = sent.last().expect("a call was sent") else {
        panic!("expected a Call message");
    };
    adapter.push_message("alpha", ChildMessage::Result { id: id.clone(), data: json!({"ok": true}) });

    let response = call.await.expect("join");
    assert_eq!(response, ServerMessage::Result { id: "req-1".to_string(), result: json!({"ok": true}) });
}

#[tokio::test]
async fn progress_frames_are_forwarded_only_to_the_originating_connection() {
    let adapter = FakeWorkerAdapter::new();
    adapter.script("alpha", vec![ChildMessage::Ready { worker_id: "work-1".into() }]);
    let (router, worker_manager, connections) = router_with(adapter.clone());
    let (caller_id, mut caller_rx) = connections.handle_open().expect("accepted");
    let (_other_id, mut other_rx) = connections.handle_open().expect("accepted");
    worker_manager.start_worker("alpha", PathBuf::from("alpha"), std::env::temp_dir()).await.expect("start");
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let router_for_cb = Arc::clone(&router);
    worker_manager.set_progress_callback(Arc::new(move |ns, call_id, message| router_for_cb.on_progress(ns, call_id, message)));

    let router2 = Arc::clone(&router);
    let call = tokio::spawn(async move { router2.route(caller_id, request("req-1", "alpha.slow", json!({}))).await });
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let sent = adapter.sent_to("alpha");
    let ParentMessage::Call { id, .. } = sent.last().expect("a call was sent") else {
        panic!("expected a Call message");
    };
    adapter.push_message("alpha", ChildMessage::Progress { id: id.clone(), message: "working".into() });
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let forwarded = caller_rx.try_recv().expect("progress delivered to caller");
    assert!(forwarded.contains("\"progress\"") && forwarded.contains("req-1"));
    assert!(other_rx.try_recv().is_err());

    adapter.push_message("alpha", ChildMessage::Result { id: id.clone(), data: json!(1) });
    call.await.expect("join");
}

#[tokio::test]
async fn rpc_list_functions_returns_the_cached_names() {
    let project = tempfile::tempdir().expect("tempdir");
    let global = tempfile::tempdir().expect("tempdir");
    write_manifest(project.path(), "alpha.tool.toml", "alpha");

    let worker_manager = WorkerManager::new(Arc::new(FakeWorkerAdapter::new()), Arc::new(SessionMemory::new()));
    let rpc_cache = Arc::new(RpcCacheManager::new(project.path().to_path_buf(), global.path().to_path_buf()));
    rpc_cache.refresh_cache().expect("refresh");
    let connections = ConnectionManager::with_defaults();
    let router = MessageRouter::new(worker_manager, rpc_cache, Arc::clone(&connections));
    let (conn_id, _rx) = connections.handle_open().expect("accepted");

    let response = router.route(conn_id, request("1", "rpc.listFunctions", json!({}))).await;
    assert_eq!(response, ServerMessage::Result { id: "1".to_string(), result: json!(["run"]) });
}

#[tokio::test]
async fn rpc_get_types_without_a_generator_wired_is_not_implemented() {
    let (router, _worker_manager, connections) = router_with(FakeWorkerAdapter::new());
    let (conn_id, _rx) = connections.handle_open().expect("accepted");

    let response = router.route(conn_id, request("1", "rpc.getTypes", json!({}))).await;
    assert!(matches!(response, ServerMessage::Error { id, error } if id == "1" && error == "not implemented"));
}

#[tokio::test]
async fn request_without_a_method_is_an_error() {
    let (router, _worker_manager, connections) = router_with(FakeWorkerAdapter::new());
    let (conn_id, _rx) = connections.handle_open().expect("accepted");

    let request = ClientRequest { id: Some("1".into()), method: None, args: None, script: None };
    let response = router.route(conn_id, request).await;
    assert!(matches!(response, ServerMessage::Error { id, .. } if id == "1"));
}
