//! Relay lifecycle
//!
//! A [`Relay`] owns the handoff queue, the dispatcher task and the delivery
//! target for one mode. It is built by [`Relay::serve`] or
//! [`Relay::bridge`] and torn down by [`Relay::shutdown`] or on drop.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::Result;
use crate::config::RelayConfig;
use crate::connection::{ReconnectPolicy, ResilientConnection, WebSocketConnector};
use crate::dispatcher::Dispatcher;
use crate::driver::Driver;
use crate::normalizer::Normalizer;
use crate::queue::{Enqueued, HandoffQueue};
use crate::registry::SessionRegistry;
use crate::server::TelemetryServer;
use crate::source::TelemetrySource;
use crate::types::{ConnectionState, RawEvent, TelemetrySnapshot};

/// Producer handle onto the relay's handoff queue.
///
/// Cheap to clone. Publishing never blocks on network I/O.
#[derive(Debug, Clone)]
pub struct Publisher {
    queue: Arc<HandoffQueue>,
    normalizer: Normalizer,
}

impl Publisher {
    pub fn new(queue: Arc<HandoffQueue>) -> Self {
        Self { queue, normalizer: Normalizer::new() }
    }

    /// Normalize and enqueue a raw event.
    ///
    /// Returns `None` when the event carried an empty frame and nothing was
    /// enqueued.
    pub fn publish(&self, event: &RawEvent) -> Option<Enqueued> {
        self.normalizer.normalize(event).map(|snapshot| self.queue.enqueue(snapshot))
    }

    /// Enqueue an already normalized snapshot.
    pub fn publish_snapshot(&self, snapshot: TelemetrySnapshot) -> Enqueued {
        self.queue.enqueue(snapshot)
    }

    pub fn queue(&self) -> &Arc<HandoffQueue> {
        &self.queue
    }
}

enum Mode {
    Serve { registry: Arc<SessionRegistry>, local_addr: SocketAddr },
    Bridge { connection: Arc<ResilientConnection> },
}

/// A running relay in either server broadcast or bridge mode.
pub struct Relay {
    publisher: Publisher,
    mode: Mode,
    cancel: CancellationToken,
    dispatcher: Option<JoinHandle<()>>,
    tasks: Vec<JoinHandle<()>>,
}

impl Relay {
    /// Start a relay that broadcasts to WebSocket subscribers.
    ///
    /// Binding the listener is the only fallible step; nothing is spawned
    /// if it fails.
    pub async fn serve(config: &RelayConfig) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(SessionRegistry::new());
        let server = TelemetryServer::bind(
            config.server.bind,
            &config.server.path,
            config.server.session_buffer,
            Arc::clone(&registry),
        )
        .await?;
        let local_addr = server.local_addr();

        let cancel = CancellationToken::new();
        let queue = Arc::new(HandoffQueue::new(config.queue_capacity));
        let dispatcher = Dispatcher::new(Arc::clone(&queue), Arc::clone(&registry), config.forward)
            .spawn(config.dispatch_interval(), cancel.child_token());

        let server_cancel = cancel.child_token();
        let server_task = tokio::spawn(async move {
            if let Err(e) = server.serve(server_cancel).await {
                warn!("Telemetry server failed: {}", e);
            }
        });

        info!(%local_addr, capacity = config.queue_capacity, "Relay serving");
        Ok(Self {
            publisher: Publisher::new(queue),
            mode: Mode::Serve { registry, local_addr },
            cancel,
            dispatcher: Some(dispatcher),
            tasks: vec![server_task],
        })
    }

    /// Start a relay that forwards to a single remote endpoint.
    pub fn bridge(config: &RelayConfig) -> Result<Self> {
        config.validate()?;

        let connection = Arc::new(ResilientConnection::spawn(
            WebSocketConnector::new(config.bridge.url.clone()),
            ReconnectPolicy::from(&config.bridge),
        ));

        let cancel = CancellationToken::new();
        let queue = Arc::new(HandoffQueue::new(config.queue_capacity));
        let dispatcher = Dispatcher::new(Arc::clone(&queue), Arc::clone(&connection), config.forward)
            .spawn(config.dispatch_interval(), cancel.child_token());

        info!(url = %config.bridge.url, capacity = config.queue_capacity, "Relay bridging");
        Ok(Self {
            publisher: Publisher::new(queue),
            mode: Mode::Bridge { connection },
            cancel,
            dispatcher: Some(dispatcher),
            tasks: Vec::new(),
        })
    }

    pub fn publisher(&self) -> Publisher {
        self.publisher.clone()
    }

    /// Pump a source into this relay until it ends or the relay shuts down.
    pub fn attach_source<S: TelemetrySource>(&mut self, source: S) {
        let pump = Driver::spawn(source, self.publisher(), self.cancel.child_token());
        self.tasks.push(tokio::spawn(async move {
            if let Ok(stats) = pump.await {
                debug!(?stats, "Source detached");
            }
        }));
    }

    /// Listening address in server mode.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.mode {
            Mode::Serve { local_addr, .. } => Some(*local_addr),
            Mode::Bridge { .. } => None,
        }
    }

    /// Live subscriber count in server mode.
    pub fn subscribers(&self) -> Option<usize> {
        match &self.mode {
            Mode::Serve { registry, .. } => Some(registry.len()),
            Mode::Bridge { .. } => None,
        }
    }

    /// Bridge connection state in bridge mode.
    pub fn connection_state(&self) -> Option<watch::Receiver<ConnectionState>> {
        match &self.mode {
            Mode::Serve { .. } => None,
            Mode::Bridge { connection } => Some(connection.subscribe_state()),
        }
    }

    /// Stop every task and release the endpoint.
    ///
    /// Snapshots still queued are discarded.
    pub async fn shutdown(mut self) {
        info!("Relay shutting down");
        self.cancel.cancel();

        if let Some(dispatcher) = self.dispatcher.take() {
            let _ = dispatcher.await;
        }
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }

        if let Mode::Bridge { connection } = &self.mode {
            connection.shutdown().await;
        }
        info!("Relay stopped");
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_physics_event;
    use crate::types::SnapshotKind;

    #[test]
    fn publisher_skips_empty_frames() {
        let queue = Arc::new(HandoffQueue::new(4));
        let publisher = Publisher::new(Arc::clone(&queue));

        assert_eq!(publisher.publish(&RawEvent::empty(SnapshotKind::Graphics)), None);
        assert_eq!(publisher.publish(&sample_physics_event()), Some(Enqueued::Accepted));
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn serve_reports_bind_failure_without_spawning() {
        let mut config = RelayConfig::default();
        config.server.bind = "127.0.0.1:0".parse().unwrap();
        let first = Relay::serve(&config).await.unwrap();

        config.server.bind = first.local_addr().unwrap();
        assert!(Relay::serve(&config).await.is_err());

        first.shutdown().await;
    }

    #[tokio::test]
    async fn bridge_starts_disconnected_endpoint_without_failing() {
        let mut config = RelayConfig::default();
        config.bridge.url = "ws://127.0.0.1:1/".to_string();
        config.bridge.backoff_ms = 50;

        let relay = Relay::bridge(&config).unwrap();
        let state = relay.connection_state().unwrap();
        assert!(!state.borrow().is_connected());
        assert_eq!(relay.local_addr(), None);

        relay.shutdown().await;
    }
}
