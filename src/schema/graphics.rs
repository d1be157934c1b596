//! Graphics page schema

use super::FieldSpec;
use crate::types::FieldType::{Float, Int, Text};

pub static GRAPHICS_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("Status", Int),
    FieldSpec::new("Session", Int),
    FieldSpec::new("SessionTimeLeft", Float),
    FieldSpec::new("SessionIndex", Int),
    // Lap times as the HUD formats them
    FieldSpec::new("CurrentTime", Text),
    FieldSpec::new("LastTime", Text),
    FieldSpec::new("BestTime", Text),
    FieldSpec::new("DeltaLapTime", Text),
    FieldSpec::new("EstimatedLapTime", Text),
    FieldSpec::new("IsValidLap", Int),
    FieldSpec::new("Position", Int),
    FieldSpec::new("CompletedLaps", Int),
    FieldSpec::new("CurrentSectorIndex", Int),
    FieldSpec::new("LastSectorTime", Int),
    FieldSpec::new("DistanceTraveled", Float),
    FieldSpec::new("IsInPit", Int),
    FieldSpec::new("IsInPitLane", Int),
    FieldSpec::new("MandatoryPitDone", Int),
    FieldSpec::new("MissingMandatoryPits", Int),
    FieldSpec::new("TrackStatus", Text),
    FieldSpec::new("SurfaceGrip", Float),
    FieldSpec::new("TrackGripStatus", Int),
    FieldSpec::new("WindSpeed", Float),
    FieldSpec::new("WindDirection", Float),
    FieldSpec::new("RainIntensity", Int),
    FieldSpec::new("RainIntensityIn10min", Int),
    FieldSpec::new("RainIntensityIn30min", Int),
    FieldSpec::new("TC", Int),
    FieldSpec::new("TCCUT", Int),
    FieldSpec::new("ABS", Int),
    FieldSpec::new("EngineMap", Int),
    FieldSpec::new("FuelXLap", Float),
    FieldSpec::new("UsedFuel", Float),
    FieldSpec::new("FuelEstimatedLaps", Float),
    FieldSpec::new("TyreCompound", Text),
    FieldSpec::new("RainTyres", Int),
    FieldSpec::new("RainLights", Int),
    FieldSpec::new("FlashingLights", Int),
    FieldSpec::new("LightsStage", Int),
    FieldSpec::new("DirectionLightsLeft", Int),
    FieldSpec::new("DirectionLightsRight", Int),
    FieldSpec::new("Flag", Int),
    FieldSpec::new("Penalty", Int),
    FieldSpec::new("PenaltyTime", Float),
    FieldSpec::new("MfdTyreSet", Int),
    FieldSpec::new("MfdFuelToAdd", Float),
    FieldSpec::new("MfdTyrePressureLF", Float),
    FieldSpec::new("MfdTyrePressureRF", Float),
    FieldSpec::new("MfdTyrePressureLR", Float),
    FieldSpec::new("MfdTyrePressureRR", Float),
];
