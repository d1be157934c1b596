//! Delivery trait for dispatch targets

use std::sync::Arc;

use crate::Result;

/// Destination the dispatcher hands encoded payloads to.
///
/// Implemented by the session registry (server broadcast mode) and the
/// resilient connection (bridge mode). A failed delivery is reported to the
/// dispatcher, which logs it and moves on to the next payload.
#[async_trait::async_trait]
pub trait Delivery: Send + Sync + 'static {
    /// Deliver one encoded payload.
    ///
    /// Returns:
    /// - `Ok(())` - payload handed off (for broadcasts: to every live session
    ///   that could take it)
    /// - `Err(e)` - payload dropped; it will not be retried
    async fn deliver(&self, payload: Arc<str>) -> Result<()>;

    /// Short label used in logs.
    fn describe(&self) -> String;
}
