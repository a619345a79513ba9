// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

use super::*;

#[test]
fn call_serializes_with_camel_case_function_name() {
    let msg = ParentMessage::Call {
        id: "1".into(),
        function_name: "run".into(),
        args: serde_json::json!({"x": 1}),
    };
    let json = serde_json::to_value(&msg).expect("serialize");
    assert_eq!(json["type"], "call");
    assert_eq!(json["functionName"], "run");
    assert_eq!(json["args"]["x"], 1);
}

#[test]
fn shutdown_has_no_extra_fields() {
    let json = serde_json::to_value(ParentMessage::Shutdown).expect("serialize");
    assert_eq!(json, serde_json::json!({"type": "shutdown"}));
}

#[test]
fn ready_roundtrips_worker_id() {
    let json = serde_json::json!({"type": "ready", "workerId": "work-abc"});
    let msg: ChildMessage = serde_json::from_value(json).expect("deserialize");
    match msg {
        ChildMessage::Ready { worker_id } => assert_eq!(worker_id, "work-abc"),
        _ => panic!("expected Ready"),
    }
}

#[test]
fn progress_roundtrips() {
    let json = serde_json::json!({"type": "progress", "id": "c1", "message": "halfway"});
    let msg: ChildMessage = serde_json::from_value(json).expect("deserialize");
    match msg {
        ChildMessage::Progress { id, message } => {
            assert_eq!(id, "c1");
            assert_eq!(message, "halfway");
        }
        _ => panic!("expected Progress"),
    }
}

#[test]
fn crash_roundtrips() {
    let json = serde_json::json!({"type": "crash", "error": "uncaught exception"});
    let msg: ChildMessage = serde_json::from_value(json).expect("deserialize");
    match msg {
        ChildMessage::Crash { error } => assert_eq!(error, "uncaught exception"),
        _ => panic!("expected Crash"),
    }
}
