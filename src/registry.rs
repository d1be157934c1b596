//! Live subscriber sessions for server broadcast mode

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use crate::codec::{self, InfoMessage};
use crate::delivery::Delivery;
use crate::{RelayError, Result};

/// Opaque session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Send capability for one connected subscriber.
///
/// The matching receiver is drained by the task that owns the subscriber's
/// socket, so sending here never waits on network I/O.
#[derive(Debug)]
pub struct Session {
    tx: mpsc::Sender<Arc<str>>,
}

impl Session {
    /// Create a session and the receiver its socket task drains.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }
}

/// Result of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Sessions that accepted the message
    pub delivered: usize,
    /// Sessions whose buffer was full; they miss this message but stay registered
    pub lagged: usize,
    /// Sessions found closed and unregistered
    pub removed: usize,
}

/// Registry of live subscriber sessions.
///
/// The registry is the sole holder of the session set. Broadcasts take a
/// read lock and push into per-session buffers; closed sessions are removed
/// afterwards under the write lock.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Session>>,
    next_id: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session and queue the connect acknowledgement to it alone.
    pub fn register(&self, session: Session) -> Result<SessionId> {
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let ack = codec::encode_info(&InfoMessage::connected())?;

        // Ack and insert under the write lock so no broadcast can precede the ack
        let live = {
            let mut sessions = self.sessions.write();
            session.tx.try_send(Arc::from(ack)).map_err(|_| {
                RelayError::send_failed(id.to_string(), "subscriber gone before acknowledgement")
            })?;
            sessions.insert(id, session);
            sessions.len()
        };
        info!(%id, live, "Subscriber connected");
        Ok(id)
    }

    /// Remove a session. Returns `false` if it was not registered.
    pub fn unregister(&self, id: SessionId) -> bool {
        let removed = self.sessions.write().remove(&id).is_some();
        if removed {
            info!(%id, live = self.len(), "Subscriber removed");
        }
        removed
    }

    /// Deliver a message to every registered session.
    ///
    /// A failure on one session never affects the others.
    pub fn broadcast_all(&self, message: Arc<str>) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let mut closed = Vec::new();

        {
            let sessions = self.sessions.read();
            for (id, session) in sessions.iter() {
                match session.tx.try_send(Arc::clone(&message)) {
                    Ok(()) => report.delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        report.lagged += 1;
                        debug!(%id, "Subscriber buffer full, message skipped");
                    }
                    Err(TrySendError::Closed(_)) => closed.push(*id),
                }
            }
        }

        for id in closed {
            if self.sessions.write().remove(&id).is_some() {
                report.removed += 1;
                warn!(%id, "Send to subscriber failed, session removed");
            }
        }

        report
    }

    /// Drop every session, closing their channels.
    pub fn close_all(&self) -> usize {
        let mut sessions = self.sessions.write();
        let count = sessions.len();
        sessions.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.read().contains_key(&id)
    }
}

#[async_trait::async_trait]
impl Delivery for SessionRegistry {
    async fn deliver(&self, payload: Arc<str>) -> Result<()> {
        self.broadcast_all(payload);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("broadcast to {} subscriber(s)", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(text: &str) -> Arc<str> {
        Arc::from(text)
    }

    #[tokio::test]
    async fn register_sends_ack_to_new_session_only() {
        let registry = SessionRegistry::new();
        let (first, mut first_rx) = Session::channel(8);
        registry.register(first).unwrap();
        let _ = first_rx.recv().await;

        let (second, mut second_rx) = Session::channel(8);
        registry.register(second).unwrap();

        let ack = second_rx.recv().await.unwrap();
        assert!(ack.contains("Connected to ACC Telemetry WebSocket"));
        assert!(first_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn failing_session_does_not_affect_others() {
        let registry = SessionRegistry::new();
        let mut receivers = Vec::new();
        let mut ids = Vec::new();
        for _ in 0..4 {
            let (session, rx) = Session::channel(8);
            ids.push(registry.register(session).unwrap());
            receivers.push(rx);
        }

        // Session 2 disconnects
        let dead = receivers.remove(2);
        drop(dead);

        let report = registry.broadcast_all(msg("payload"));
        assert_eq!(report, BroadcastReport { delivered: 3, lagged: 0, removed: 1 });
        assert!(!registry.contains(ids[2]));

        for rx in &mut receivers {
            assert!(rx.recv().await.unwrap().contains("Info"));
            assert_eq!(&*rx.recv().await.unwrap(), "payload");
        }
    }

    #[tokio::test]
    async fn unregistered_session_receives_nothing_further() {
        let registry = SessionRegistry::new();
        let (session, mut rx) = Session::channel(8);
        let id = registry.register(session).unwrap();
        let _ack = rx.recv().await.unwrap();

        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));

        let report = registry.broadcast_all(msg("late"));
        assert_eq!(report.delivered, 0);
        // Sender dropped with the session, so the channel is closed and empty
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn full_buffer_lags_without_removal() {
        let registry = SessionRegistry::new();
        let (session, mut rx) = Session::channel(1);
        let id = registry.register(session).unwrap();

        // Ack occupies the only slot
        let report = registry.broadcast_all(msg("dropped"));
        assert_eq!(report.lagged, 1);
        assert!(registry.contains(id));

        let _ack = rx.recv().await.unwrap();
        registry.broadcast_all(msg("kept"));
        assert_eq!(&*rx.recv().await.unwrap(), "kept");
    }

    #[tokio::test]
    async fn per_session_order_matches_broadcast_order() {
        let registry = SessionRegistry::new();
        let (session, mut rx) = Session::channel(16);
        registry.register(session).unwrap();
        let _ack = rx.recv().await.unwrap();

        for i in 0..5 {
            registry.broadcast_all(msg(&i.to_string()));
        }
        for i in 0..5 {
            assert_eq!(&*rx.recv().await.unwrap(), i.to_string());
        }
    }

    #[test]
    fn close_all_empties_registry() {
        let registry = SessionRegistry::new();
        let (a, _a_rx) = Session::channel(2);
        let (b, _b_rx) = Session::channel(2);
        registry.register(a).unwrap();
        registry.register(b).unwrap();

        assert_eq!(registry.close_all(), 2);
        assert!(registry.is_empty());
    }
}
