// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

use super::*;

#[test]
fn register_then_get_returns_handler() {
    let mut registry = ToolRegistry::new();
    registry.register("run", |args, _ctx| Ok(args));
    let handler = registry.get("run").expect("handler registered");
    let ctx = ToolContext::for_test();
    assert_eq!(handler(serde_json::json!({"x": 1}), &ctx), Ok(serde_json::json!({"x": 1})));
}

#[test]
fn get_returns_none_for_unregistered_name() {
    let registry = ToolRegistry::new();
    assert!(registry.get("missing").is_none());
}

#[test]
fn function_names_are_sorted() {
    let mut registry = ToolRegistry::new();
    registry.register("zeta", |a, _| Ok(a));
    registry.register("alpha", |a, _| Ok(a));
    assert_eq!(registry.function_names(), vec!["alpha".to_string(), "zeta".to_string()]);
}

#[test]
fn re_registering_a_name_replaces_the_handler() {
    let mut registry = ToolRegistry::new();
    registry.register("run", |_args, _ctx| Ok(serde_json::json!("first")));
    registry.register("run", |_args, _ctx| Ok(serde_json::json!("second")));
    let handler = registry.get("run").expect("handler registered");
    let ctx = ToolContext::for_test();
    assert_eq!(handler(serde_json::Value::Null, &ctx), Ok(serde_json::json!("second")));
}
