//! Telemetry snapshot types

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Value;
use crate::RelayError;

/// Discriminator for the three telemetry event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnapshotKind {
    /// Car physics, emitted at sub-10ms cadence
    Physics,
    /// Session and HUD state, emitted roughly once a second
    Graphics,
    /// Static session metadata, emitted on session change
    StaticInfo,
}

impl SnapshotKind {
    /// All kinds, in schema order.
    pub const ALL: [SnapshotKind; 3] =
        [SnapshotKind::Physics, SnapshotKind::Graphics, SnapshotKind::StaticInfo];

    /// Name used in the `Type` field of the wire payload.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SnapshotKind::Physics => "Physics",
            SnapshotKind::Graphics => "Graphics",
            SnapshotKind::StaticInfo => "StaticInfo",
        }
    }
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SnapshotKind {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Physics" => Ok(SnapshotKind::Physics),
            "Graphics" => Ok(SnapshotKind::Graphics),
            "StaticInfo" => Ok(SnapshotKind::StaticInfo),
            other => Err(RelayError::decode(format!("unknown snapshot type '{other}'"))),
        }
    }
}

/// One named field of a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub value: Value,
}

impl Field {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

/// Immutable point-in-time telemetry record of one kind.
///
/// Fields are kept in insertion order and shared behind an `Arc`, so
/// cloning a snapshot never copies field data and no holder can mutate it.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySnapshot {
    kind: SnapshotKind,
    fields: Arc<[Field]>,
    captured_at: DateTime<Utc>,
}

impl TelemetrySnapshot {
    /// Create a snapshot from an ordered field list.
    pub fn new(kind: SnapshotKind, fields: Vec<Field>, captured_at: DateTime<Utc>) -> Self {
        Self { kind, fields: fields.into(), captured_at }
    }

    /// Create a snapshot stamped with the current time.
    pub fn now(kind: SnapshotKind, fields: Vec<Field>) -> Self {
        Self::new(kind, fields, Utc::now())
    }

    pub fn kind(&self) -> SnapshotKind {
        self.kind
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|field| field.name == name).map(|field| &field.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip() {
        for kind in SnapshotKind::ALL {
            assert_eq!(kind.as_str().parse::<SnapshotKind>().unwrap(), kind);
        }
        assert!("Info".parse::<SnapshotKind>().is_err());
    }

    #[test]
    fn clones_share_field_storage() {
        let snapshot = TelemetrySnapshot::now(
            SnapshotKind::Physics,
            vec![Field::new("SpeedKmh", 120.0), Field::new("Gear", 3)],
        );
        let copy = snapshot.clone();

        assert!(std::ptr::eq(snapshot.fields().as_ptr(), copy.fields().as_ptr()));
        assert_eq!(copy.get("Gear"), Some(&Value::Int(3)));
        assert_eq!(copy.get("Missing"), None);
    }
}
