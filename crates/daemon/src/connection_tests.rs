// SPDX-License-Identifier: MIT
// Copyright (c) 2026 wrkd contributors

use super::*;

#[test]
fn handle_open_accepts_until_capacity_then_rejects() {
    let manager = ConnectionManager::new(2, MAX_MESSAGE_BYTES_DEFAULT);
    let (_id1, _rx1) = manager.handle_open().expect("first accepted");
    let (_id2, _rx2) = manager.handle_open().expect("second accepted");
    assert_eq!(manager.connection_count(), 2);

    let err = manager.handle_open().unwrap_err();
    assert_eq!(err, ConnectionError::AtCapacity);
}

#[test]
fn handle_close_frees_a_capacity_slot() {
    let manager = ConnectionManager::new(1, MAX_MESSAGE_BYTES_DEFAULT);
    let (id, _rx) = manager.handle_open().expect("accepted");
    assert!(manager.handle_open().is_err());

    manager.handle_close(id);
    assert!(manager.handle_open().is_ok());
}

#[test]
fn handle_message_rejects_oversized_messages() {
    let manager = ConnectionManager::new(MAX_CONNECTIONS_DEFAULT, 8);
    let (id, _rx) = manager.handle_open().expect("accepted");

    let err = manager.handle_message(id, "0123456789").unwrap_err();
    assert_eq!(err, ConnectionError::MessageTooLarge);
}

#[test]
fn handle_message_enforces_the_rate_limit() {
    let manager = ConnectionManager::new(MAX_CONNECTIONS_DEFAULT, MAX_MESSAGE_BYTES_DEFAULT);
    let (id, _rx) = manager.handle_open().expect("accepted");

    for _ in 0..RATE_LIMIT_MESSAGES {
        manager.handle_message(id, "ping").expect("within limit");
    }
    let err = manager.handle_message(id, "ping").unwrap_err();
    assert_eq!(err, ConnectionError::RateLimited);
}

#[test]
fn handle_message_on_unknown_connection_is_an_error() {
    let manager = ConnectionManager::with_defaults();
    let ghost = ConnectionId::new();
    assert!(manager.handle_message(ghost, "hi").is_err());
}

#[test]
fn broadcast_delivers_to_every_connection() {
    let manager = ConnectionManager::with_defaults();
    let (_id1, mut rx1) = manager.handle_open().expect("accepted");
    let (_id2, mut rx2) = manager.handle_open().expect("accepted");

    manager.broadcast_to_clients("hello");

    assert_eq!(rx1.try_recv().unwrap(), "hello");
    assert_eq!(rx2.try_recv().unwrap(), "hello");
}

#[test]
fn broadcast_drops_connections_whose_receiver_was_dropped() {
    let manager = ConnectionManager::with_defaults();
    let (_id, rx) = manager.handle_open().expect("accepted");
    drop(rx);

    manager.broadcast_to_clients("hello");
    assert_eq!(manager.connection_count(), 0);
}

#[test]
fn close_all_clears_every_connection() {
    let manager = ConnectionManager::with_defaults();
    manager.handle_open().expect("accepted");
    manager.handle_open().expect("accepted");
    manager.close_all();
    assert_eq!(manager.connection_count(), 0);
}

#[test]
fn idle_cleanup_pings_an_idle_connection_and_keeps_it_alive() {
    let manager = ConnectionManager::with_defaults();
    let (id, mut rx) = manager.handle_open().expect("accepted");

    {
        let mut connections = manager.connections.lock();
        let conn = connections.get_mut(&id).unwrap();
        conn.last_activity = Instant::now() - IDLE_PING_AFTER - Duration::from_secs(1);
    }

    manager.run_idle_cleanup();
    assert_eq!(rx.try_recv().unwrap(), r#"{"type":"ping"}"#);
    assert_eq!(manager.connection_count(), 1);
}

#[test]
fn idle_cleanup_drops_a_connection_whose_ping_fails_to_send() {
    let manager = ConnectionManager::with_defaults();
    let (id, rx) = manager.handle_open().expect("accepted");
    drop(rx);

    {
        let mut connections = manager.connections.lock();
        let conn = connections.get_mut(&id).unwrap();
        conn.last_activity = Instant::now() - IDLE_PING_AFTER - Duration::from_secs(1);
    }

    manager.run_idle_cleanup();
    assert_eq!(manager.connection_count(), 0);
}

#[test]
fn take_is_first_frame_is_true_exactly_once() {
    let manager = ConnectionManager::with_defaults();
    let (id, _rx) = manager.handle_open().expect("accepted");

    assert!(manager.take_is_first_frame(id));
    assert!(!manager.take_is_first_frame(id));
}

#[test]
fn activity_refreshes_last_activity_so_idle_cleanup_skips_it() {
    let manager = ConnectionManager::with_defaults();
    let (id, _rx) = manager.handle_open().expect("accepted");

    {
        let mut connections = manager.connections.lock();
        let conn = connections.get_mut(&id).unwrap();
        conn.last_activity = Instant::now() - IDLE_PING_AFTER - Duration::from_secs(1);
    }

    manager.handle_message(id, "hi").expect("known connection");
    let connections = manager.connections.lock();
    assert!(Instant::now().duration_since(connections.get(&id).unwrap().last_activity) < IDLE_PING_AFTER);
}
