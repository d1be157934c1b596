//! Test doubles and fixtures shared by unit tests and benches.

#![cfg(any(test, feature = "benchmark"))]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::codec::{self, DecodedPayload};
use crate::connection::{Connector, Established, Link};
use crate::delivery::Delivery;
use crate::types::{Field, RawEvent, RawFrame, SnapshotKind, TelemetrySnapshot};
use crate::{RelayError, Result};

/// Fixed capture time used by fixtures: 2024-07-28T14:00:00.250Z.
pub fn fixture_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 28, 14, 0, 0)
        .single()
        .map(|t| t + chrono::Duration::milliseconds(250))
        .unwrap_or_default()
}

/// A physics frame as a source would report it mid-lap.
pub fn sample_physics_frame() -> RawFrame {
    RawFrame::new()
        .with("PacketId", 1042)
        .with("Gas", 0.85)
        .with("Brake", 0.0)
        .with("Gear", 4)
        .with("Rpms", 7350)
        .with("SteerAngle", -0.12)
        .with("SpeedKmh", 187.4)
        .with("Velocity", [51.2f32, 0.1, 2.3])
        .with("WheelPressure", [27.1f32, 27.3, 26.8, 26.9])
        .with("TyreCoreTemp", [88.0f32, 89.5, 85.2, 86.0])
        .with("Fuel", 42.5)
}

pub fn sample_physics_event() -> RawEvent {
    RawEvent::new(SnapshotKind::Physics, sample_physics_frame())
}

/// Snapshot carrying a single field.
pub fn snapshot_with(kind: SnapshotKind, name: &str, value: impl Into<crate::types::Value>) -> TelemetrySnapshot {
    TelemetrySnapshot::new(kind, vec![Field::new(name, value)], fixture_time())
}

/// Delivery target that records payloads.
#[derive(Debug, Default)]
pub struct RecordingTarget {
    payloads: Mutex<Vec<Arc<str>>>,
    calls: AtomicUsize,
    fail_on: Option<usize>,
}

impl RecordingTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `index`th delivery (0-based) without recording it.
    pub fn failing_on(index: usize) -> Self {
        Self { fail_on: Some(index), ..Self::default() }
    }

    pub fn payloads(&self) -> Vec<Arc<str>> {
        self.payloads.lock().clone()
    }

    /// Recorded payloads decoded back into kind and fields.
    pub fn decoded(&self) -> Vec<DecodedPayload> {
        self.payloads().iter().filter_map(|p| codec::decode(p).ok()).collect()
    }
}

#[async_trait::async_trait]
impl Delivery for RecordingTarget {
    async fn deliver(&self, payload: Arc<str>) -> Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on == Some(call) {
            return Err(RelayError::send_failed("recording", "injected failure"));
        }
        self.payloads.lock().push(payload);
        Ok(())
    }

    fn describe(&self) -> String {
        "recording target".to_string()
    }
}

#[derive(Debug, Default)]
struct MockState {
    refuse: AtomicBool,
    hang: AtomicBool,
    connect_delay: Mutex<Duration>,
    fail_sends: AtomicBool,
    attempts: AtomicUsize,
    sent: Mutex<Vec<String>>,
    links: Mutex<Vec<CancellationToken>>,
}

/// In-memory connector whose links can be refused, broken or closed on demand.
///
/// Clones share state, so a test keeps one handle after moving another into
/// the connection under test.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    state: Arc<MockState>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connector that refuses every attempt until [`set_refusing`](Self::set_refusing)`(false)`.
    pub fn refusing() -> Self {
        let connector = Self::default();
        connector.set_refusing(true);
        connector
    }

    pub fn set_refusing(&self, refuse: bool) {
        self.state.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Make connect attempts never complete.
    pub fn set_hanging(&self, hang: bool) {
        self.state.hang.store(hang, Ordering::SeqCst);
    }

    /// Delay every successful connect by `delay`.
    pub fn set_connect_delay(&self, delay: Duration) {
        *self.state.connect_delay.lock() = delay;
    }

    /// Make every send on every link fail.
    pub fn set_failing_sends(&self, fail: bool) {
        self.state.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> usize {
        self.state.attempts.load(Ordering::SeqCst)
    }

    /// Links handed out so far.
    pub fn links_opened(&self) -> usize {
        self.state.links.lock().len()
    }

    pub fn sent(&self) -> Vec<String> {
        self.state.sent.lock().clone()
    }

    /// Simulate the remote closing the most recent link.
    pub fn close_remote(&self) {
        if let Some(closed) = self.state.links.lock().last() {
            closed.cancel();
        }
    }
}

#[async_trait::async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<Established> {
        self.state.attempts.fetch_add(1, Ordering::SeqCst);
        if self.state.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let delay = *self.state.connect_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.state.refuse.load(Ordering::SeqCst) {
            return Err(RelayError::connection_failed("connection refused"));
        }
        let closed = CancellationToken::new();
        self.state.links.lock().push(closed.clone());
        let link = MockLink { state: Arc::clone(&self.state), closed: closed.clone() };
        Ok(Established::new(Box::new(link), closed))
    }

    fn endpoint(&self) -> &str {
        "mock://relay"
    }
}

struct MockLink {
    state: Arc<MockState>,
    closed: CancellationToken,
}

#[async_trait::async_trait]
impl Link for MockLink {
    async fn send_text(&mut self, text: &str) -> Result<()> {
        if self.closed.is_cancelled() || self.state.fail_sends.load(Ordering::SeqCst) {
            return Err(RelayError::send_failed("mock", "broken pipe"));
        }
        self.state.sent.lock().push(text.to_string());
        Ok(())
    }

    async fn close(&mut self) {
        self.closed.cancel();
    }
}
