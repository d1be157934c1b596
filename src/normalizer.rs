//! Raw event to snapshot normalization

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::schema::{self, FieldSpec};
use crate::types::{Field, RawEvent, RawFrame, SnapshotKind, TelemetrySnapshot};

/// Converts raw source events into schema-conforming snapshots.
///
/// Normalization is a pure transform and never fails:
/// - an empty or missing frame produces no snapshot
/// - a missing or malformed field degrades to its schema default
/// - fields outside the schema are dropped
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize an event, stamping it with the current time.
    pub fn normalize(&self, event: &RawEvent) -> Option<TelemetrySnapshot> {
        self.normalize_at(event, Utc::now())
    }

    /// Normalize an event with an explicit capture time.
    pub fn normalize_at(
        &self,
        event: &RawEvent,
        captured_at: DateTime<Utc>,
    ) -> Option<TelemetrySnapshot> {
        let frame = match &event.frame {
            Some(frame) if !frame.is_empty() => frame,
            _ => {
                trace!(kind = %event.kind, "Skipping empty frame");
                return None;
            }
        };

        let specs = schema::fields_for(event.kind);
        let mut defaulted = 0usize;
        let fields = specs
            .iter()
            .map(|spec| {
                let (field, was_defaulted) = map_field(spec, frame);
                defaulted += usize::from(was_defaulted);
                field
            })
            .collect();

        if defaulted > 0 {
            trace!(kind = %event.kind, defaulted, "Fields degraded to schema defaults");
        }

        Some(TelemetrySnapshot::new(event.kind, fields, captured_at))
    }

    /// Convenience for sources that have a frame in hand.
    pub fn normalize_frame(&self, kind: SnapshotKind, frame: &RawFrame) -> Option<TelemetrySnapshot> {
        self.normalize(&RawEvent::new(kind, frame.clone()))
    }
}

fn map_field(spec: &FieldSpec, frame: &RawFrame) -> (Field, bool) {
    match frame.get(spec.name).and_then(|raw| spec.ty.coerce(raw)) {
        Some(value) => (Field { name: spec.name.to_string(), value }, false),
        None => (Field { name: spec.name.to_string(), value: spec.ty.default_value() }, true),
    }
}
