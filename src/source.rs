//! Source trait for raw telemetry events

use crate::Result;
use crate::types::RawEvent;

/// Trait for telemetry sources.
///
/// A source adapts whatever the simulator exposes (shared memory reader,
/// recorded stream, pipe from another process) into [`RawEvent`]s and paces
/// itself: `next_event` resolves when the next event is available.
#[async_trait::async_trait]
pub trait TelemetrySource: Send + 'static {
    /// Get the next raw event.
    ///
    /// Returns:
    /// - `Ok(Some(event))` - event available
    /// - `Ok(None)` - source ended (normal termination)
    /// - `Err(e)` - read failed; the caller may retry
    async fn next_event(&mut self) -> Result<Option<RawEvent>>;

    /// Short label used in logs.
    fn describe(&self) -> String {
        "telemetry source".to_string()
    }
}
