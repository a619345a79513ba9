// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

//! Tracks every connected WebSocket client: connection admission, message
//! size/rate limits, idle cleanup, and outbound broadcast.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc;
use wrkd_core::id::ConnectionId;

const MAX_CONNECTIONS_DEFAULT: usize = 100;
const MAX_MESSAGE_BYTES_DEFAULT: usize = 1024 * 1024;
const RATE_LIMIT_MESSAGES: u32 = 50;
const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(1);
const IDLE_CLEANUP_INTERVAL: Duration = Duration::from_secs(30);
const IDLE_PING_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("Server at connection limit")]
    AtCapacity,
    #[error("Message too large.")]
    MessageTooLarge,
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error("connection '{0}' is not registered")]
    Unknown(String),
}

struct RateWindow {
    window_start: Instant,
    count: u32,
}

struct ClientConnection {
    outbox: mpsc::UnboundedSender<String>,
    last_activity: Instant,
    rate: RateWindow,
    seen_first_frame: bool,
}

/// Admits, rate-limits, and tracks every live client connection.
pub struct ConnectionManager {
    connections: Mutex<HashMap<ConnectionId, ClientConnection>>,
    max_connections: usize,
    max_message_bytes: usize,
    connection_count: AtomicU64,
}

impl ConnectionManager {
    pub fn new(max_connections: usize, max_message_bytes: usize) -> Arc<Self> {
        Arc::new(Self {
            connections: Mutex::new(HashMap::new()),
            max_connections,
            max_message_bytes,
            connection_count: AtomicU64::new(0),
        })
    }

    pub fn with_defaults() -> Arc<Self> {
        Self::new(MAX_CONNECTIONS_DEFAULT, MAX_MESSAGE_BYTES_DEFAULT)
    }

    /// Admits a new connection, returning its id and the receiver end of its
    /// outbound message queue, or an error if the server is at capacity.
    pub fn handle_open(&self) -> Result<(ConnectionId, mpsc::UnboundedReceiver<String>), ConnectionError> {
        let mut connections = self.connections.lock();
        if connections.len() >= self.max_connections {
            return Err(ConnectionError::AtCapacity);
        }
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        connections.insert(
            id,
            ClientConnection {
                outbox: tx,
                last_activity: Instant::now(),
                rate: RateWindow { window_start: Instant::now(), count: 0 },
                seen_first_frame: false,
            },
        );
        self.connection_count.fetch_add(1, Ordering::Relaxed);
        Ok((id, rx))
    }

    /// Validates an inbound message (size, rate limit) and records
    /// activity. Returns the message on success for the caller to route.
    pub fn handle_message(&self, id: ConnectionId, message: &str) -> Result<(), ConnectionError> {
        if message.len() > self.max_message_bytes {
            return Err(ConnectionError::MessageTooLarge);
        }

        let mut connections = self.connections.lock();
        let conn = connections.get_mut(&id).ok_or_else(|| ConnectionError::Unknown(id.to_string()))?;

        let now = Instant::now();
        conn.last_activity = now;

        if now.duration_since(conn.rate.window_start) > RATE_LIMIT_WINDOW {
            conn.rate.window_start = now;
            conn.rate.count = 0;
        }
        conn.rate.count += 1;
        if conn.rate.count > RATE_LIMIT_MESSAGES {
            return Err(ConnectionError::RateLimited);
        }
        Ok(())
    }

    /// Returns whether this is the first frame seen on `id` (and records
    /// that the connection has now seen one), so callers can decide
    /// whether to run the welcome handshake instead of routing.
    pub fn take_is_first_frame(&self, id: ConnectionId) -> bool {
        let mut connections = self.connections.lock();
        match connections.get_mut(&id) {
            Some(conn) if !conn.seen_first_frame => {
                conn.seen_first_frame = true;
                true
            }
            _ => false,
        }
    }

    pub fn handle_close(&self, id: ConnectionId) {
        if self.connections.lock().remove(&id).is_some() {
            self.connection_count.fetch_sub(1, Ordering::Relaxed);
        }
    }

    pub fn send_to(&self, id: ConnectionId, message: String) {
        let connections = self.connections.lock();
        if let Some(conn) = connections.get(&id) {
            let _ = conn.outbox.send(message);
        }
    }

    pub fn broadcast_to_clients(&self, message: &str) {
        let mut dead = Vec::new();
        {
            let connections = self.connections.lock();
            for (id, conn) in connections.iter() {
                if conn.outbox.send(message.to_string()).is_err() {
                    dead.push(*id);
                }
            }
        }
        for id in dead {
            self.handle_close(id);
        }
    }

    pub fn close_all(&self) {
        self.connections.lock().clear();
        self.connection_count.store(0, Ordering::Relaxed);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Pings every connection idle for more than a minute; drops any whose
    /// outbox send fails, meaning the client's receiver is gone.
    pub fn run_idle_cleanup(&self) {
        let now = Instant::now();
        let mut dead = Vec::new();
        {
            let connections = self.connections.lock();
            for (id, conn) in connections.iter() {
                if now.duration_since(conn.last_activity) < IDLE_PING_AFTER {
                    continue;
                }
                if conn.outbox.send(r#"{"type":"ping"}"#.to_string()).is_err() {
                    dead.push(*id);
                }
            }
        }
        for id in dead {
            self.handle_close(id);
        }
    }

    pub fn spawn_idle_cleanup(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(IDLE_CLEANUP_INTERVAL).await;
                manager.run_idle_cleanup();
            }
        });
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
