//! Wire payload encoding.
//!
//! One JSON object per message:
//!
//! ```text
//! {"Type":"Physics","PacketId":1,"SpeedKmh":120.0,...,"Timestamp":"2024-07-28T14:00:00.123Z"}
//! ```
//!
//! Fields are flattened between `Type` and `Timestamp` in schema order.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::types::{Field, SnapshotKind, TelemetrySnapshot, Value};
use crate::{RelayError, Result};

const TYPE_KEY: &str = "Type";
const TIMESTAMP_KEY: &str = "Timestamp";

/// Acknowledgement sent to a subscriber right after it connects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoMessage {
    #[serde(rename = "Type")]
    pub msg_type: String,
    #[serde(rename = "Message")]
    pub message: String,
}

impl InfoMessage {
    pub fn connected() -> Self {
        Self { msg_type: "Info".to_string(), message: "Connected to ACC Telemetry WebSocket".to_string() }
    }
}

/// Borrowed view that serializes a snapshot as a flat payload object.
struct Payload<'a>(&'a TelemetrySnapshot);

impl Serialize for Payload<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let snapshot = self.0;
        let fields = snapshot.fields();
        let mut map = serializer.serialize_map(Some(fields.len() + 2))?;
        map.serialize_entry(TYPE_KEY, snapshot.kind().as_str())?;
        for field in fields {
            // Envelope keys always win
            if field.name == TYPE_KEY || field.name == TIMESTAMP_KEY {
                continue;
            }
            map.serialize_entry(&field.name, &field.value)?;
        }
        map.serialize_entry(
            TIMESTAMP_KEY,
            &snapshot.captured_at().to_rfc3339_opts(SecondsFormat::AutoSi, true),
        )?;
        map.end()
    }
}

/// Encode a snapshot as its JSON wire payload.
pub fn encode(snapshot: &TelemetrySnapshot) -> Result<String> {
    serde_json::to_string(&Payload(snapshot)).map_err(RelayError::from)
}

/// Encode the connect acknowledgement.
pub fn encode_info(info: &InfoMessage) -> Result<String> {
    serde_json::to_string(info).map_err(RelayError::from)
}

/// A payload decoded back into its parts.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPayload {
    pub kind: SnapshotKind,
    pub fields: Vec<Field>,
    pub timestamp: DateTime<Utc>,
}

impl DecodedPayload {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|field| field.name == name).map(|field| &field.value)
    }

    /// Rebuild the snapshot this payload was encoded from.
    pub fn into_snapshot(self) -> TelemetrySnapshot {
        TelemetrySnapshot::new(self.kind, self.fields, self.timestamp)
    }
}

/// Decode a telemetry payload produced by [`encode`].
pub fn decode(text: &str) -> Result<DecodedPayload> {
    let object: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(text).map_err(|e| RelayError::decode(e.to_string()))?;

    let mut kind = None;
    let mut timestamp = None;
    let mut fields = Vec::with_capacity(object.len().saturating_sub(2));

    for (name, raw) in object {
        match name.as_str() {
            TYPE_KEY => {
                let type_name =
                    raw.as_str().ok_or_else(|| RelayError::decode("'Type' is not a string"))?;
                kind = Some(type_name.parse::<SnapshotKind>()?);
            }
            TIMESTAMP_KEY => {
                let stamp =
                    raw.as_str().ok_or_else(|| RelayError::decode("'Timestamp' is not a string"))?;
                let parsed = DateTime::parse_from_rfc3339(stamp)
                    .map_err(|e| RelayError::decode(format!("bad timestamp '{stamp}': {e}")))?;
                timestamp = Some(parsed.with_timezone(&Utc));
            }
            _ => {
                let value: Value = serde_json::from_value(raw)
                    .map_err(|e| RelayError::decode(format!("field '{name}': {e}")))?;
                fields.push(Field { name, value });
            }
        }
    }

    Ok(DecodedPayload {
        kind: kind.ok_or_else(|| RelayError::decode("missing 'Type'"))?,
        fields,
        timestamp: timestamp.ok_or_else(|| RelayError::decode("missing 'Timestamp'"))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::Normalizer;
    use crate::types::{RawEvent, RawFrame};
    use proptest::prelude::*;

    fn fixed_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-07-28T14:00:00.250Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn payload_is_flat_with_envelope_keys() {
        let snapshot = TelemetrySnapshot::new(
            SnapshotKind::Physics,
            vec![Field::new("SpeedKmh", 120.0), Field::new("Gear", 3)],
            fixed_time(),
        );

        let json = encode(&snapshot).unwrap();
        assert_eq!(
            json,
            r#"{"Type":"Physics","SpeedKmh":120.0,"Gear":3,"Timestamp":"2024-07-28T14:00:00.250Z"}"#
        );
    }

    #[test]
    fn info_message_matches_wire_format() {
        let json = encode_info(&InfoMessage::connected()).unwrap();
        assert_eq!(json, r#"{"Type":"Info","Message":"Connected to ACC Telemetry WebSocket"}"#);
    }

    #[test]
    fn normalized_snapshots_round_trip() {
        let frame = RawFrame::new()
            .with("Track", "Spa")
            .with("MaxRpm", 8000)
            .with("MaxFuel", 120.0)
            .with("PlayerName", "Max");
        let snapshot = Normalizer::new()
            .normalize_at(&RawEvent::new(SnapshotKind::StaticInfo, frame), fixed_time())
            .unwrap();

        let decoded = decode(&encode(&snapshot).unwrap()).unwrap();
        assert_eq!(decoded.kind, SnapshotKind::StaticInfo);
        assert_eq!(decoded.timestamp, fixed_time());
        assert_eq!(decoded.into_snapshot(), snapshot);
    }

    #[test]
    fn decode_rejects_foreign_messages() {
        assert!(decode("not json").is_err());
        assert!(decode(r#"{"Type":"Info","Message":"hi"}"#).is_err());
        assert!(decode(r#"{"Type":"Physics","SpeedKmh":1.0}"#).is_err());
        assert!(decode(r#"{"SpeedKmh":1.0,"Timestamp":"2024-07-28T14:00:00Z"}"#).is_err());
    }

    proptest! {
        #[test]
        fn prop_physics_payload_round_trips(
            speed in 0.0f64..400.0,
            gear in -1i64..8,
            rpms in 0i64..9000,
            temps in prop::array::uniform4(20.0f64..900.0),
        ) {
            let frame = RawFrame::new()
                .with("SpeedKmh", speed)
                .with("Gear", gear)
                .with("Rpms", rpms)
                .with("BrakeTemp", Value::Array(temps.iter().map(|t| Value::Float(*t)).collect()));
            let snapshot = Normalizer::new()
                .normalize_at(&RawEvent::new(SnapshotKind::Physics, frame), fixed_time())
                .unwrap();

            let decoded = decode(&encode(&snapshot).unwrap()).unwrap();
            prop_assert_eq!(decoded.kind, SnapshotKind::Physics);
            prop_assert_eq!(decoded.fields.as_slice(), snapshot.fields());
        }
    }
}
