//! Single outbound connection with fixed-backoff reconnect

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::Stream;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{Connector, Established, Link};
use crate::config::BridgeConfig;
use crate::delivery::Delivery;
use crate::types::ConnectionState;
use crate::{RelayError, Result};

/// Timing knobs for the reconnect state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Fixed wait between losing a link and the next attempt
    pub backoff: Duration,
    /// Upper bound on a single connect attempt
    pub connect_timeout: Duration,
    /// Upper bound on a single send
    pub send_timeout: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(2),
            send_timeout: Duration::from_secs(2),
        }
    }
}

impl From<&BridgeConfig> for ReconnectPolicy {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            backoff: config.backoff(),
            connect_timeout: config.connect_timeout(),
            send_timeout: config.send_timeout(),
        }
    }
}

struct ActiveLink {
    id: u64,
    link: Box<dyn Link>,
    closed: CancellationToken,
}

/// Shared state. Every state transition happens while `slot` is locked,
/// which makes the slot lock the single owner of the state machine.
struct Inner {
    connector: Box<dyn Connector>,
    slot: Mutex<Option<ActiveLink>>,
    state: watch::Sender<ConnectionState>,
    policy: ReconnectPolicy,
    next_link: AtomicU64,
}

impl Inner {
    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(endpoint = self.connector.endpoint(), "Connection state {} -> {}", previous, next);
        }
    }

    /// Attempt one connection into an empty slot.
    async fn establish(&self, slot: &mut Option<ActiveLink>) -> Result<()> {
        self.set_state(ConnectionState::Connecting);

        let attempt = tokio::time::timeout(self.policy.connect_timeout, self.connector.connect()).await;
        let established = match attempt {
            Ok(Ok(established)) => established,
            Ok(Err(e)) => {
                self.set_state(ConnectionState::Disconnected);
                return Err(e);
            }
            Err(_) => {
                self.set_state(ConnectionState::Disconnected);
                return Err(RelayError::timeout("connect", self.policy.connect_timeout));
            }
        };

        let Established { link, closed } = established;
        let id = self.next_link.fetch_add(1, Ordering::Relaxed);
        *slot = Some(ActiveLink { id, link, closed });
        self.set_state(ConnectionState::Connected);
        info!(endpoint = self.connector.endpoint(), link = id, "Connected");
        Ok(())
    }

    /// Tear down whatever link occupies the slot.
    async fn discard(&self, slot: &mut Option<ActiveLink>) {
        if let Some(mut active) = slot.take() {
            active.closed.cancel();
            let _ = tokio::time::timeout(self.policy.send_timeout, active.link.close()).await;
        }
        self.set_state(ConnectionState::Disconnected);
    }
}

/// Outbound connection that reconnects on its own.
///
/// State machine: `Disconnected -> Connecting -> Connected`, back to
/// `Disconnected` on close or error, then `Backoff -> Connecting` after the
/// fixed backoff. Messages are never buffered across a disconnection.
///
/// The supervisor task stops on [`shutdown`](Self::shutdown) or when the
/// value is dropped.
pub struct ResilientConnection {
    inner: Arc<Inner>,
    cancel: CancellationToken,
    supervisor: parking_lot::Mutex<Option<JoinHandle<()>>>,
    /// Earliest time a send may attempt another inline connect
    retry_after: parking_lot::Mutex<Option<Instant>>,
}

impl ResilientConnection {
    /// Start the connection. The first attempt runs immediately in the
    /// background; this never fails.
    pub fn spawn<C: Connector>(connector: C, policy: ReconnectPolicy) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let inner = Arc::new(Inner {
            connector: Box::new(connector),
            slot: Mutex::new(None),
            state,
            policy,
            next_link: AtomicU64::new(0),
        });
        let cancel = CancellationToken::new();
        let supervisor = tokio::spawn(supervise(Arc::clone(&inner), cancel.clone()));

        Self {
            inner,
            cancel,
            supervisor: parking_lot::Mutex::new(Some(supervisor)),
            retry_after: parking_lot::Mutex::new(None),
        }
    }

    /// Send one message.
    ///
    /// When no link is up, one inline connect is attempted first. If that
    /// fails, or the send itself fails, the message is dropped and the error
    /// returned; the link is torn down so the supervisor starts over.
    ///
    /// A send never waits on reconnection. It fails at once while the
    /// supervisor is mid-connect, and for one backoff interval after a
    /// failed inline connect.
    pub async fn send(&self, text: &str) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(RelayError::send_failed(self.endpoint(), "connection shut down"));
        }

        let mut slot = match self.inner.slot.try_lock() {
            Ok(slot) => slot,
            Err(_) if self.state() == ConnectionState::Connecting => {
                return Err(RelayError::send_failed(self.endpoint(), "reconnect in progress"));
            }
            // Held briefly by a state check or a teardown
            Err(_) => self.inner.slot.lock().await,
        };

        if slot.is_none() {
            let now = Instant::now();
            let cooling_down = self.retry_after.lock().is_some_and(|after| now < after);
            if cooling_down {
                return Err(RelayError::send_failed(self.endpoint(), "not connected"));
            }
            if let Err(e) = self.inner.establish(&mut slot).await {
                *self.retry_after.lock() = Some(Instant::now() + self.inner.policy.backoff);
                return Err(e);
            }
            *self.retry_after.lock() = None;
        }

        let Some(active) = slot.as_mut() else {
            return Err(RelayError::send_failed(self.endpoint(), "not connected"));
        };

        let outcome = tokio::time::timeout(self.inner.policy.send_timeout, active.link.send_text(text)).await;
        let error = match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => e,
            Err(_) => RelayError::timeout("send", self.inner.policy.send_timeout),
        };

        warn!(endpoint = self.endpoint(), "Send failed, dropping link: {}", error);
        self.inner.discard(&mut slot).await;
        Err(error)
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Watch receiver for state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Stream of states, starting with the current one.
    pub fn state_changes(&self) -> impl Stream<Item = ConnectionState> + 'static {
        WatchStream::new(self.inner.state.subscribe())
    }

    pub fn endpoint(&self) -> &str {
        self.inner.connector.endpoint()
    }

    /// Stop reconnecting and close the link. Later sends fail.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let supervisor = self.supervisor.lock().take();
        if let Some(handle) = supervisor {
            let _ = handle.await;
        }
    }
}

impl Drop for ResilientConnection {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[async_trait::async_trait]
impl Delivery for ResilientConnection {
    async fn deliver(&self, payload: Arc<str>) -> Result<()> {
        self.send(&payload).await
    }

    fn describe(&self) -> String {
        format!("bridge to {} ({})", self.endpoint(), self.state())
    }
}

async fn supervise(inner: Arc<Inner>, cancel: CancellationToken) {
    let endpoint = inner.connector.endpoint().to_string();
    info!(%endpoint, "Connection supervisor started");
    let mut first_attempt = true;

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let watched = {
            let slot = inner.slot.lock().await;
            slot.as_ref().map(|active| (active.id, active.closed.clone()))
        };

        if let Some((id, closed)) = watched {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = closed.cancelled() => {
                    let mut slot = inner.slot.lock().await;
                    // A send may already have replaced this link
                    if slot.as_ref().is_some_and(|active| active.id == id) {
                        warn!(%endpoint, link = id, "Connection lost");
                        inner.discard(&mut slot).await;
                    }
                }
            }
            continue;
        }

        if !first_attempt {
            {
                let slot = inner.slot.lock().await;
                if slot.is_some() {
                    continue;
                }
                inner.set_state(ConnectionState::Backoff);
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(inner.policy.backoff) => {}
            }
        }
        first_attempt = false;

        let mut slot = inner.slot.lock().await;
        if slot.is_some() {
            continue;
        }
        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = inner.establish(&mut slot) => result,
        };
        if let Err(e) = result {
            warn!(%endpoint, "Connect attempt failed: {}", e);
        }
    }

    let mut slot = inner.slot.lock().await;
    inner.discard(&mut slot).await;
    info!(%endpoint, "Connection supervisor stopped");
}
