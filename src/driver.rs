//! Driver spawns and manages the source pump task

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::queue::Enqueued;
use crate::relay::Publisher;
use crate::source::TelemetrySource;

/// Consecutive source errors tolerated before the pump gives up.
pub const MAX_ERRORS: u32 = 10;

/// Counters reported when the pump stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    /// Events read from the source
    pub events: u64,
    /// Snapshots handed to the queue
    pub published: u64,
    /// Events with empty frames
    pub empty: u64,
    /// Snapshots that evicted an older one
    pub evictions: u64,
}

/// Driver pumps a [`TelemetrySource`] into a [`Publisher`].
///
/// The pump owns the source. Normalizing and enqueueing are synchronous
/// and never wait on network I/O, so a slow subscriber cannot stall the
/// source.
pub struct Driver;

impl Driver {
    /// Spawn the pump task.
    ///
    /// The task ends when the source ends, after [`MAX_ERRORS`] consecutive
    /// errors, or when `cancel` fires.
    pub fn spawn<S>(source: S, publisher: Publisher, cancel: CancellationToken) -> JoinHandle<PumpStats>
    where
        S: TelemetrySource,
    {
        tokio::spawn(async move { Self::pump(source, publisher, cancel).await })
    }

    async fn pump<S>(mut source: S, publisher: Publisher, cancel: CancellationToken) -> PumpStats
    where
        S: TelemetrySource,
    {
        info!(source = %source.describe(), "Source pump started");
        let mut stats = PumpStats::default();
        let mut error_count = 0u32;

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Source pump cancelled");
                    break;
                }
                result = source.next_event() => result,
            };

            match result {
                Ok(Some(event)) => {
                    stats.events += 1;
                    error_count = 0;

                    match publisher.publish(&event) {
                        Some(outcome) => {
                            stats.published += 1;
                            if outcome == Enqueued::EvictedOldest {
                                stats.evictions += 1;
                            }
                            trace!(kind = %event.kind, "Published event {}", stats.events);
                        }
                        None => stats.empty += 1,
                    }
                }
                Ok(None) => {
                    info!("Source ended after {} events", stats.events);
                    break;
                }
                Err(e) => {
                    error_count += 1;
                    error!("Source error ({}/{}): {}", error_count, MAX_ERRORS, e);

                    if error_count >= MAX_ERRORS {
                        error!("Too many source errors, stopping pump");
                        break;
                    }

                    // Exponential backoff: 100ms, 200ms, 400ms, ... capped at 1.6s
                    let backoff = Duration::from_millis(50 * (1 << error_count.min(5)));
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        }

        info!(
            events = stats.events,
            published = stats.published,
            empty = stats.empty,
            evictions = stats.evictions,
            "Source pump stopped"
        );
        stats
    }
}
