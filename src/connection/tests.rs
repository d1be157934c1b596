//! Reconnect state machine tests against an in-memory connector

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::time::Instant;

use super::*;
use crate::RelayError;
use crate::config::ForwardPolicy;
use crate::dispatcher::Dispatcher;
use crate::queue::HandoffQueue;
use crate::test_utils::{MockConnector, snapshot_with};
use crate::types::{ConnectionState, SnapshotKind};

fn policy(backoff_ms: u64) -> ReconnectPolicy {
    ReconnectPolicy {
        backoff: Duration::from_millis(backoff_ms),
        connect_timeout: Duration::from_millis(500),
        send_timeout: Duration::from_millis(500),
    }
}

async fn wait_until(
    connection: &ResilientConnection,
    mut predicate: impl FnMut(&ConnectionState) -> bool,
) -> ConnectionState {
    let mut rx = connection.subscribe_state();
    let state = tokio::time::timeout(Duration::from_secs(3), rx.wait_for(|s| predicate(s)))
        .await
        .expect("state not reached in time")
        .expect("state channel closed");
    *state
}

#[tokio::test]
async fn connects_on_start_without_a_send() {
    let connector = MockConnector::new();
    let connection = ResilientConnection::spawn(connector.clone(), policy(50));

    wait_until(&connection, |s| s.is_connected()).await;
    assert_eq!(connector.links_opened(), 1);
}

#[tokio::test]
async fn remote_close_reconnects_after_backoff() {
    let backoff = Duration::from_millis(150);
    let connector = MockConnector::new();
    let connection = ResilientConnection::spawn(connector.clone(), policy(150));
    wait_until(&connection, |s| s.is_connected()).await;

    // Keep Connecting visible long enough to be observed
    connector.set_connect_delay(Duration::from_millis(50));
    let mut changes = Box::pin(connection.state_changes());
    assert_eq!(changes.next().await, Some(ConnectionState::Connected));

    let closed_at = Instant::now();
    connector.close_remote();

    let mut seen = Vec::new();
    tokio::time::timeout(Duration::from_secs(3), async {
        while let Some(state) = changes.next().await {
            seen.push(state);
            if state.is_connected() {
                break;
            }
        }
    })
    .await
    .expect("never reconnected");

    assert!(closed_at.elapsed() >= backoff, "reconnected after {:?}", closed_at.elapsed());
    // The watch channel may fold Disconnected into the Backoff that follows it
    seen.retain(|s| *s != ConnectionState::Disconnected);
    assert_eq!(seen, vec![ConnectionState::Backoff, ConnectionState::Connecting, ConnectionState::Connected]);
    assert_eq!(connector.links_opened(), 2);
}

#[tokio::test]
async fn send_fails_when_reconnect_fails() {
    let connector = MockConnector::refusing();
    let connection = ResilientConnection::spawn(connector.clone(), policy(10_000));
    wait_until(&connection, |s| *s == ConnectionState::Backoff).await;

    let result = connection.send("lost").await;

    assert!(matches!(result, Err(RelayError::Connection { .. })));
    assert!(!connection.state().is_connected());
    assert!(connector.sent().is_empty());
}

#[tokio::test]
async fn failed_inline_connect_waits_out_backoff() {
    let connector = MockConnector::refusing();
    let connection = ResilientConnection::spawn(connector.clone(), policy(10_000));
    wait_until(&connection, |s| *s == ConnectionState::Backoff).await;

    assert!(connection.send("first").await.is_err());
    let attempts = connector.attempts();

    // Within the backoff the next send fails without another attempt
    connector.set_refusing(false);
    let result = connection.send("second").await;
    assert!(matches!(result, Err(RelayError::Send { .. })));
    assert_eq!(connector.attempts(), attempts);
    assert!(connector.sent().is_empty());
}

#[tokio::test]
async fn send_reconnects_inline() {
    let connector = MockConnector::refusing();
    let connection = ResilientConnection::spawn(connector.clone(), policy(10_000));
    wait_until(&connection, |s| *s == ConnectionState::Backoff).await;

    connector.set_refusing(false);
    connection.send("hello").await.unwrap();

    assert_eq!(connector.sent(), vec!["hello".to_string()]);
    assert_eq!(connection.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn sends_do_not_wait_for_supervisor_connect() {
    let connector = MockConnector::new();
    connector.set_hanging(true);
    let connection = Arc::new(ResilientConnection::spawn(connector.clone(), policy(10_000)));
    wait_until(&connection, |s| *s == ConnectionState::Connecting).await;

    let queue = Arc::new(HandoffQueue::new(32));
    for i in 0..20 {
        queue.enqueue(snapshot_with(SnapshotKind::Physics, "PacketId", i));
    }

    let started = Instant::now();
    let report = Dispatcher::new(Arc::clone(&queue), connection, ForwardPolicy::all()).tick().await;

    assert_eq!(report.failed, 20);
    assert!(started.elapsed() < Duration::from_millis(500), "tick took {:?}", started.elapsed());
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test]
async fn unreachable_bridge_costs_one_connect_timeout_per_tick() {
    let connect_timeout = Duration::from_millis(500);
    let connector = MockConnector::new();
    connector.set_hanging(true);
    let connection = Arc::new(ResilientConnection::spawn(connector.clone(), policy(10_000)));
    // The supervisor's own attempt times out first
    wait_until(&connection, |s| *s == ConnectionState::Backoff).await;

    let queue = Arc::new(HandoffQueue::new(32));
    for i in 0..20 {
        queue.enqueue(snapshot_with(SnapshotKind::Physics, "PacketId", i));
    }

    let started = Instant::now();
    let report = Dispatcher::new(Arc::clone(&queue), connection, ForwardPolicy::all()).tick().await;
    let elapsed = started.elapsed();

    assert_eq!(report.failed, 20);
    assert!(elapsed >= connect_timeout);
    assert!(elapsed < connect_timeout * 2, "tick took {elapsed:?}");
    assert_eq!(connector.attempts(), 2);
}

#[tokio::test]
async fn failed_send_drops_message_and_link() {
    let connector = MockConnector::new();
    let connection = ResilientConnection::spawn(connector.clone(), policy(100));
    wait_until(&connection, |s| s.is_connected()).await;

    connector.set_failing_sends(true);
    assert!(connection.send("dropped").await.is_err());
    assert!(!connection.state().is_connected());

    connector.set_failing_sends(false);
    wait_until(&connection, |s| s.is_connected()).await;
    connection.send("after").await.unwrap();

    // The dropped message is never resent
    assert_eq!(connector.sent(), vec!["after".to_string()]);
}

#[tokio::test]
async fn dispatcher_survives_unreachable_bridge() {
    let connector = MockConnector::refusing();
    let connection = Arc::new(ResilientConnection::spawn(connector, policy(10_000)));
    let queue = Arc::new(HandoffQueue::new(8));
    for i in 0..3 {
        queue.enqueue(snapshot_with(SnapshotKind::Physics, "PacketId", i));
    }

    let report = Dispatcher::new(Arc::clone(&queue), connection, ForwardPolicy::all()).tick().await;

    assert_eq!(report.dequeued, 3);
    assert_eq!(report.failed, 3);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn shutdown_closes_link() {
    let connector = MockConnector::new();
    let connection = ResilientConnection::spawn(connector.clone(), policy(50));
    wait_until(&connection, |s| s.is_connected()).await;
    let states = connection.subscribe_state();

    tokio::time::timeout(Duration::from_secs(3), connection.shutdown())
        .await
        .expect("shutdown hung");

    assert_eq!(*states.borrow(), ConnectionState::Disconnected);
    assert_eq!(connector.links_opened(), 1);
}
