// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

//! The daemon's single listener: `GET /functions` and `GET /health` for
//! discovery/monitoring, `GET /ws` for clients.

use crate::connection::ConnectionManager;
use crate::health::HealthMonitor;
use crate::router::MessageRouter;
use crate::rpc_cache::RpcCacheManager;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use wrkd_wire::client::{ClientRequest, ServerMessage};

#[derive(Clone)]
pub struct AppState {
    pub connections: Arc<ConnectionManager>,
    pub router: Arc<MessageRouter>,
    pub rpc_cache: Arc<RpcCacheManager>,
    pub health: Arc<HealthMonitor>,
    pub worker_manager: Arc<crate::worker::WorkerManager>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/functions", get(get_functions))
        .route("/health", get(get_health))
        .route("/ws", get(upgrade_ws))
        .with_state(state)
}

#[derive(Serialize)]
struct FunctionsResponse {
    functions: Vec<String>,
}

async fn get_functions(State(state): State<AppState>) -> Json<FunctionsResponse> {
    Json(FunctionsResponse { functions: state.rpc_cache.function_names() })
}

#[derive(Serialize)]
struct HealthResponse {
    cpu_percent: f32,
    rss_bytes: u64,
    scheduler_lag_ms: u64,
    total_workers: usize,
    ready_workers: usize,
    failed_workers: usize,
    pending_calls: usize,
}

async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.health.snapshot();
    let stats = state.worker_manager.stats();
    Json(HealthResponse {
        cpu_percent: snapshot.cpu_percent,
        rss_bytes: snapshot.rss_bytes,
        scheduler_lag_ms: snapshot.scheduler_lag.as_millis() as u64,
        total_workers: stats.total_workers,
        ready_workers: stats.ready_workers,
        failed_workers: stats.failed_workers,
        pending_calls: stats.pending_calls,
    })
}

async fn upgrade_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let Ok((connection_id, mut outbox)) = state.connections.handle_open() else {
        return;
    };

    let (mut sink, mut stream) = socket.split();
    let forward = tokio::spawn(async move {
        while let Some(message) = outbox.recv().await {
            if sink.send(Message::Text(message)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        let Message::Text(text) = message else {
            if matches!(message, Message::Close(_)) {
                break;
            }
            continue;
        };

        if let Err(err) = state.connections.handle_message(connection_id, &text) {
            state.connections.send_to(connection_id, error_frame(&err.to_string()));
            continue;
        }

        let request: ClientRequest = match serde_json::from_str(&text) {
            Ok(request) => request,
            Err(err) => {
                debug!(%err, "malformed client frame");
                state.connections.send_to(connection_id, error_frame("malformed request"));
                continue;
            }
        };

        let is_first_frame = state.connections.take_is_first_frame(connection_id);
        if is_first_frame && request.method.is_none() && request.script.is_none() {
            state.connections.send_to(connection_id, to_json(&state.router.welcome()));
            continue;
        }

        let response = state.router.route(connection_id, request).await;
        state.connections.send_to(connection_id, to_json(&response));
    }

    forward.abort();
    state.connections.handle_close(connection_id);
}

fn to_json(message: &ServerMessage) -> String {
    serde_json::to_string(message).unwrap_or_else(|_| r#"{"type":"error","error":"internal encoding error"}"#.to_string())
}

fn error_frame(error: &str) -> String {
    to_json(&ServerMessage::ServerError { error: error.to_string() })
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
