//! Telemetry relay for Assetto Corsa Competizione.
//!
//! ACC Relay takes the simulator's physics, graphics and static-info
//! snapshots and delivers them as JSON over WebSocket, either broadcast to
//! any number of subscribers or pushed to a single downstream endpoint.
//!
//! # Architecture
//!
//! - **Normalizer**: maps loosely typed source frames onto fixed per-kind schemas
//! - **Handoff queue**: bounded, drop-oldest buffer between producers and network I/O
//! - **Dispatcher**: drains the queue on a fixed period and delivers in order
//! - **Session registry**: live subscriber set for server broadcast mode
//! - **Resilient connection**: self-healing outbound link for bridge mode
//!
//! # Example (server broadcast)
//!
//! ```rust,no_run
//! use acc_relay::{RawEvent, RawFrame, Relay, RelayConfig, SnapshotKind};
//!
//! #[tokio::main]
//! async fn main() -> acc_relay::Result<()> {
//!     let relay = Relay::serve(&RelayConfig::default()).await?;
//!     let publisher = relay.publisher();
//!
//!     let frame = RawFrame::new().with("SpeedKmh", 120.0).with("Gear", 3);
//!     publisher.publish(&RawEvent::new(SnapshotKind::Physics, frame));
//!
//!     relay.shutdown().await;
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Payload pipeline
pub mod codec;
pub mod config;
pub mod normalizer;
pub mod queue;
pub mod schema;

// Delivery
pub mod connection;
pub mod delivery;
pub mod dispatcher;
pub mod receiver;
pub mod registry;
pub mod server;

// Sources and lifecycle
pub mod driver;
pub mod relay;
pub mod source;
pub mod sources;

// Core exports
pub use error::*;
pub use types::*;

// Main API exports
pub use config::RelayConfig;
pub use connection::{ResilientConnection, WebSocketConnector};
pub use dispatcher::{Dispatcher, TickReport};
pub use queue::HandoffQueue;
pub use registry::SessionRegistry;
pub use relay::{Publisher, Relay};
pub use source::TelemetrySource;
pub use sources::LineSource;
