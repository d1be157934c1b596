//! Core types for relayed telemetry.
//!
//! - [`RawEvent`] / [`RawFrame`] carry loosely typed data from a source
//! - [`TelemetrySnapshot`] is the immutable, normalized record that flows
//!   through the handoff queue to the dispatcher
//! - [`Value`] and [`FieldType`] describe field values and their schema types
//! - [`ConnectionState`] tracks the bridge-mode outbound link
//!
//! ## Usage Example
//!
//! ```rust
//! use acc_relay::types::{Field, SnapshotKind, TelemetrySnapshot, Value};
//!
//! let snapshot = TelemetrySnapshot::now(
//!     SnapshotKind::Physics,
//!     vec![Field::new("SpeedKmh", 120.0), Field::new("Gear", 4)],
//! );
//!
//! assert_eq!(snapshot.get("Gear"), Some(&Value::Int(4)));
//! ```

mod connection_state;
mod raw;
mod snapshot;
mod value;

// Re-export all public types
pub use connection_state::ConnectionState;
pub use raw::{RawEvent, RawFrame};
pub use snapshot::{Field, SnapshotKind, TelemetrySnapshot};
pub use value::{FieldType, Value};
