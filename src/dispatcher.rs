//! Periodic dispatcher draining the handoff queue

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::codec;
use crate::config::ForwardPolicy;
use crate::delivery::Delivery;
use crate::queue::HandoffQueue;

/// Counters for one dispatch tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Snapshots drained from the queue
    pub dequeued: usize,
    /// Payloads handed to the delivery target
    pub delivered: usize,
    /// Payloads that failed to encode or deliver
    pub failed: usize,
    /// Snapshots dropped by the forwarding policy
    pub filtered: usize,
}

/// Drains the handoff queue on a fixed period and delivers each snapshot in order.
///
/// Periodic dispatch coalesces bursts of physics updates into batched sends
/// and bounds outbound writes per second independently of producer rate.
pub struct Dispatcher<D: Delivery> {
    queue: Arc<HandoffQueue>,
    target: Arc<D>,
    policy: ForwardPolicy,
}

impl<D: Delivery> Dispatcher<D> {
    pub fn new(queue: Arc<HandoffQueue>, target: Arc<D>, policy: ForwardPolicy) -> Self {
        Self { queue, target, policy }
    }

    /// Run a single dispatch tick.
    ///
    /// One failed send never stalls the tick: the failure is logged and
    /// the next snapshot is processed.
    pub async fn tick(&self) -> TickReport {
        let batch = self.queue.dequeue_all();
        let mut report = TickReport { dequeued: batch.len(), ..TickReport::default() };
        if batch.is_empty() {
            return report;
        }

        for snapshot in batch {
            if !self.policy.forwards(snapshot.kind()) {
                report.filtered += 1;
                continue;
            }

            let payload = match codec::encode(&snapshot) {
                Ok(json) => Arc::<str>::from(json),
                Err(e) => {
                    report.failed += 1;
                    warn!(kind = %snapshot.kind(), "Failed to encode snapshot: {}", e);
                    continue;
                }
            };

            match self.target.deliver(payload).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    debug!(kind = %snapshot.kind(), "Delivery failed: {}", e);
                }
            }
        }

        if report.failed > 0 {
            warn!(
                failed = report.failed,
                delivered = report.delivered,
                "Dispatch tick had failed deliveries ({})",
                self.target.describe()
            );
        }
        trace!(?report, "Dispatch tick complete");
        report
    }

    /// Spawn the dispatch loop.
    ///
    /// The loop stops when `cancel` fires; anything still queued at that
    /// point is discarded.
    pub fn spawn(self, period: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(period, cancel).await })
    }

    async fn run(self, period: Duration, cancel: CancellationToken) {
        info!(period_ms = period.as_millis() as u64, "Dispatcher started");
        let mut timer = interval(period);
        // Delay rather than burst after a slow tick
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut ticks = 0u64;
        let mut delivered = 0u64;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = timer.tick() => {
                    let report = self.tick().await;
                    ticks += 1;
                    delivered += report.delivered as u64;
                }
            }
        }

        let discarded = self.queue.clear();
        if discarded > 0 {
            debug!(discarded, "Discarded queued snapshots at shutdown");
        }
        info!(ticks, delivered, evicted = self.queue.evicted(), "Dispatcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingTarget;
    use crate::types::{Field, SnapshotKind, TelemetrySnapshot};

    fn snapshot(kind: SnapshotKind, name: &str, value: i64) -> TelemetrySnapshot {
        TelemetrySnapshot::now(kind, vec![Field::new(name, value)])
    }

    #[tokio::test]
    async fn empty_queue_tick_is_noop() {
        let queue = Arc::new(HandoffQueue::new(8));
        let target = Arc::new(RecordingTarget::new());
        let dispatcher = Dispatcher::new(queue, Arc::clone(&target), ForwardPolicy::all());

        assert_eq!(dispatcher.tick().await, TickReport::default());
        assert!(target.payloads().is_empty());
    }

    #[tokio::test]
    async fn tick_delivers_in_dequeue_order() {
        let queue = Arc::new(HandoffQueue::new(8));
        let target = Arc::new(RecordingTarget::new());
        for i in 0..3 {
            queue.enqueue(snapshot(SnapshotKind::Physics, "PacketId", i));
        }

        let dispatcher = Dispatcher::new(Arc::clone(&queue), Arc::clone(&target), ForwardPolicy::all());
        let report = dispatcher.tick().await;

        assert_eq!(report.dequeued, 3);
        assert_eq!(report.delivered, 3);
        let ids: Vec<_> = target
            .decoded()
            .iter()
            .map(|p| p.get("PacketId").and_then(|v| v.as_int()).unwrap())
            .collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn one_failure_does_not_stall_the_tick() {
        let queue = Arc::new(HandoffQueue::new(8));
        let target = Arc::new(RecordingTarget::failing_on(1));
        for i in 0..3 {
            queue.enqueue(snapshot(SnapshotKind::Physics, "PacketId", i));
        }

        let report = Dispatcher::new(queue, Arc::clone(&target), ForwardPolicy::all()).tick().await;

        assert_eq!(report.delivered, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(target.payloads().len(), 2);
    }

    #[tokio::test]
    async fn policy_filters_disabled_kinds() {
        let queue = Arc::new(HandoffQueue::new(8));
        let target = Arc::new(RecordingTarget::new());
        queue.enqueue(snapshot(SnapshotKind::Physics, "Gear", 3));
        queue.enqueue(snapshot(SnapshotKind::Graphics, "Session", 2));
        queue.enqueue(snapshot(SnapshotKind::StaticInfo, "NumCars", 20));

        let report =
            Dispatcher::new(queue, Arc::clone(&target), ForwardPolicy::physics_only()).tick().await;

        assert_eq!(report, TickReport { dequeued: 3, delivered: 1, failed: 0, filtered: 2 });
        assert_eq!(target.decoded()[0].kind, SnapshotKind::Physics);
    }

    #[tokio::test]
    async fn spawned_loop_drains_periodically_and_stops_on_cancel() {
        let queue = Arc::new(HandoffQueue::new(8));
        let target = Arc::new(RecordingTarget::new());
        let cancel = CancellationToken::new();
        let handle = Dispatcher::new(Arc::clone(&queue), Arc::clone(&target), ForwardPolicy::all())
            .spawn(Duration::from_millis(10), cancel.clone());

        queue.enqueue(snapshot(SnapshotKind::Physics, "PacketId", 7));
        tokio::time::timeout(Duration::from_secs(2), async {
            while target.payloads().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("dispatcher never delivered");

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("dispatcher did not stop")
            .unwrap();
    }
}
