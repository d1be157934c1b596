//! Raw telemetry events as delivered by a source

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{SnapshotKind, Value};

/// Loosely typed field map read from the simulator.
///
/// Sources fill whatever they can read; the normalizer decides what
/// survives into a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawFrame {
    values: HashMap<String, Value>,
}

impl RawFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for RawFrame {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}

/// One event from the simulation source.
///
/// `frame` is `None` when the simulator published an empty frame, which
/// happens during scene transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub kind: SnapshotKind,
    #[serde(default)]
    pub frame: Option<RawFrame>,
}

impl RawEvent {
    pub fn new(kind: SnapshotKind, frame: RawFrame) -> Self {
        Self { kind, frame: Some(frame) }
    }

    pub fn empty(kind: SnapshotKind) -> Self {
        Self { kind, frame: None }
    }
}
