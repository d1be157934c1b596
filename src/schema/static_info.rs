//! Static info page schema

use super::FieldSpec;
use crate::types::FieldType::{Float, Int, Text};

pub static STATIC_INFO_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("SMVersion", Text),
    FieldSpec::new("ACVersion", Text),
    FieldSpec::new("NumberOfSessions", Int),
    FieldSpec::new("NumCars", Int),
    FieldSpec::new("SectorCount", Int),
    FieldSpec::new("IsOnline", Int),
    FieldSpec::new("PlayerName", Text),
    FieldSpec::new("PlayerSurname", Text),
    FieldSpec::new("PlayerNick", Text),
    FieldSpec::new("CarModel", Text),
    FieldSpec::new("Track", Text),
    FieldSpec::new("TrackConfiguration", Text),
    FieldSpec::new("MaxRpm", Int),
    FieldSpec::new("MaxFuel", Float),
    FieldSpec::new("PenaltiesEnabled", Int),
    FieldSpec::new("PitWindowStart", Int),
    FieldSpec::new("PitWindowEnd", Int),
    FieldSpec::new("AidFuelRate", Float),
    FieldSpec::new("AidTireRate", Float),
    FieldSpec::new("AidMechanicalDamage", Float),
    FieldSpec::new("AidAllowTyreBlankets", Int),
    FieldSpec::new("AidStability", Float),
    FieldSpec::new("AidAutoClutch", Int),
    FieldSpec::new("AidAutoBlip", Int),
    FieldSpec::new("DryTyresName", Text),
    FieldSpec::new("WetTyresName", Text),
];
