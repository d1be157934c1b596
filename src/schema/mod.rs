//! Versioned per-kind field schemas.
//!
//! Each snapshot kind has a fixed, ordered field list. The order is the
//! order fields appear in the wire payload. Field names match what the
//! simulator's shared-memory reader reports, misspellings included, since
//! downstream consumers key on them.

mod graphics;
mod physics;
mod static_info;

use crate::types::{FieldType, SnapshotKind};

pub use graphics::GRAPHICS_FIELDS;
pub use physics::PHYSICS_FIELDS;
pub use static_info::STATIC_INFO_FIELDS;

/// Version of the field schemas. Bump when a field is added, removed or retyped.
pub const SCHEMA_VERSION: u32 = 1;

/// Declaration of one schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
}

impl FieldSpec {
    pub const fn new(name: &'static str, ty: FieldType) -> Self {
        Self { name, ty }
    }
}

/// Field schema for a snapshot kind.
pub fn fields_for(kind: SnapshotKind) -> &'static [FieldSpec] {
    match kind {
        SnapshotKind::Physics => PHYSICS_FIELDS,
        SnapshotKind::Graphics => GRAPHICS_FIELDS,
        SnapshotKind::StaticInfo => STATIC_INFO_FIELDS,
    }
}

/// Look up a single field spec by name.
pub fn field_spec(kind: SnapshotKind, name: &str) -> Option<&'static FieldSpec> {
    fields_for(kind).iter().find(|spec| spec.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn schemas_have_unique_names() {
        for kind in SnapshotKind::ALL {
            let fields = fields_for(kind);
            let names: HashSet<_> = fields.iter().map(|spec| spec.name).collect();
            assert_eq!(names.len(), fields.len(), "{kind} schema has duplicate names");
        }
    }

    #[test]
    fn schemas_never_shadow_envelope_keys() {
        for kind in SnapshotKind::ALL {
            assert!(field_spec(kind, "Type").is_none());
            assert!(field_spec(kind, "Timestamp").is_none());
        }
    }

    #[test]
    fn key_fields_are_present_with_expected_types() {
        assert_eq!(field_spec(SnapshotKind::Physics, "SpeedKmh").map(|s| s.ty), Some(FieldType::Float));
        assert_eq!(field_spec(SnapshotKind::Physics, "Gear").map(|s| s.ty), Some(FieldType::Int));
        assert_eq!(
            field_spec(SnapshotKind::Physics, "BrakeTemp").map(|s| s.ty),
            Some(FieldType::FloatArray(4))
        );
        assert_eq!(field_spec(SnapshotKind::Graphics, "Session").map(|s| s.ty), Some(FieldType::Int));
        assert_eq!(field_spec(SnapshotKind::StaticInfo, "Track").map(|s| s.ty), Some(FieldType::Text));
    }
}
