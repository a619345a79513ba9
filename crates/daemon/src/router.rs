// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

//! Routes a parsed client frame to the right worker call or meta handler,
//! and correlates out-of-band progress frames back to their originating
//! connection and request id.

use crate::connection::ConnectionManager;
use crate::rpc_cache::RpcCacheManager;
use crate::worker::WorkerManager;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use wrkd_core::id::ConnectionId;
use wrkd_wire::client::{ClientRequest, ServerMessage};

/// Delegated handler for `rpc.getTypes`/`rpc.getClient`. No implementation
/// is wired by default; those methods then answer with "not implemented".
pub trait TypeClientGenerator: Send + Sync {
    fn get_types(&self) -> Result<Value, String>;
    fn get_client(&self) -> Result<Value, String>;
}

#[derive(Clone)]
struct PendingRoute {
    connection_id: ConnectionId,
    request_id: String,
}

/// Parses `{id?, method, args?}` client frames and dispatches them to
/// `WorkerManager.call_function` or a meta handler, guaranteeing exactly
/// one terminal response per request id.
pub struct MessageRouter {
    worker_manager: Arc<WorkerManager>,
    rpc_cache: Arc<RpcCacheManager>,
    connections: Arc<ConnectionManager>,
    type_client_generator: Option<Arc<dyn TypeClientGenerator>>,
    in_flight: Mutex<HashMap<String, PendingRoute>>,
}

impl MessageRouter {
    pub fn new(worker_manager: Arc<WorkerManager>, rpc_cache: Arc<RpcCacheManager>, connections: Arc<ConnectionManager>) -> Arc<Self> {
        Arc::new(Self {
            worker_manager,
            rpc_cache,
            connections,
            type_client_generator: None,
            in_flight: Mutex::new(HashMap::new()),
        })
    }

    pub fn with_type_client_generator(mut self, generator: Arc<dyn TypeClientGenerator>) -> Self {
        self.type_client_generator = Some(generator);
        self
    }

    /// The welcome frame sent once, on the first non-call frame of a
    /// connection.
    pub fn welcome(&self) -> ServerMessage {
        ServerMessage::Welcome { functions: self.rpc_cache.function_names() }
    }

    /// Routes one client request, returning its single terminal response
    /// frame. `connection_id` is only used to correlate progress frames
    /// the call emits while in flight; the response itself is returned to
    /// the caller to send.
    pub async fn route(&self, connection_id: ConnectionId, request: ClientRequest) -> ServerMessage {
        let id = request.id.unwrap_or_default();

        let Some(method) = request.method.as_deref() else {
            return ServerMessage::Error { id, error: "request is missing a method".to_string() };
        };
        let Some((namespace, function_name)) = method.split_once('.') else {
            return ServerMessage::Error { id, error: format!("invalid method '{method}'") };
        };

        if namespace == "rpc" {
            return self.route_meta(id, function_name);
        }

        let args = request.args.unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        let request_id = id.clone();
        let in_flight = &self.in_flight;
        let route_connection_id = connection_id;
        let mut assigned_call_id: Option<String> = None;

        let result = self
            .worker_manager
            .call_function_tracked(namespace, function_name, args, |call_id| {
                in_flight.lock().insert(
                    call_id.to_string(),
                    PendingRoute { connection_id: route_connection_id, request_id: request_id.clone() },
                );
                assigned_call_id = Some(call_id.to_string());
            })
            .await;

        if let Some(call_id) = assigned_call_id {
            self.in_flight.lock().remove(&call_id);
        }

        match result {
            Ok(value) => ServerMessage::Result { id, result: value },
            Err(err) => ServerMessage::Error { id, error: err.to_string() },
        }
    }

    fn route_meta(&self, id: String, function_name: &str) -> ServerMessage {
        match function_name {
            "listFunctions" => ServerMessage::Result { id, result: serde_json::json!(self.rpc_cache.function_names()) },
            "getTypes" => self.delegate(id, |g| g.get_types()),
            "getClient" => self.delegate(id, |g| g.get_client()),
            other => ServerMessage::Error { id, error: format!("unknown method 'rpc.{other}'") },
        }
    }

    fn delegate(&self, id: String, f: impl FnOnce(&dyn TypeClientGenerator) -> Result<Value, String>) -> ServerMessage {
        match &self.type_client_generator {
            Some(generator) => match f(generator.as_ref()) {
                Ok(result) => ServerMessage::Result { id, result },
                Err(error) => ServerMessage::Error { id, error },
            },
            None => ServerMessage::Error { id, error: "not implemented".to_string() },
        }
    }

    /// Installed as the `WorkerManager` progress callback. Looks up which
    /// connection and request id `call_id` belongs to and forwards the
    /// frame only to that client.
    pub fn on_progress(&self, _namespace: &str, call_id: &str, message: &str) {
        let Some(route) = self.in_flight.lock().get(call_id).cloned() else {
            return;
        };
        let frame = ServerMessage::Progress { id: route.request_id, message: message.to_string() };
        if let Ok(json) = serde_json::to_string(&frame) {
            self.connections.send_to(route.connection_id, json);
        }
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
