//! Physics page schema

use super::FieldSpec;
use crate::types::FieldType::{Float, FloatArray, Int};

pub static PHYSICS_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("PacketId", Int),
    FieldSpec::new("SpeedKmh", Float),
    FieldSpec::new("Gas", Float),
    FieldSpec::new("Brake", Float),
    FieldSpec::new("Clutch", Float),
    FieldSpec::new("Gear", Int),
    FieldSpec::new("Rpms", Int),
    FieldSpec::new("Fuel", Float),
    FieldSpec::new("SteerAngle", Float),
    FieldSpec::new("TC", Float),
    FieldSpec::new("Abs", Float),
    FieldSpec::new("TurboBoost", Float),
    FieldSpec::new("AutoShifterOn", Int),
    FieldSpec::new("PitLimiterOn", Int),
    FieldSpec::new("IsAIControlled", Int),
    // Vectors: x, y, z
    FieldSpec::new("Velocity", FloatArray(3)),
    FieldSpec::new("LocalVelocity", FloatArray(3)),
    FieldSpec::new("AccG", FloatArray(3)),
    FieldSpec::new("LocalAngularVelocity", FloatArray(3)),
    FieldSpec::new("Heading", Float),
    FieldSpec::new("Pitch", Float),
    FieldSpec::new("Roll", Float),
    // Per-wheel: FL, FR, RL, RR
    FieldSpec::new("WheelSlip", FloatArray(4)),
    FieldSpec::new("WheelPressure", FloatArray(4)),
    FieldSpec::new("WheelAngularSpeed", FloatArray(4)),
    FieldSpec::new("BrakeTemp", FloatArray(4)),
    FieldSpec::new("BreakPressure", FloatArray(4)),
    FieldSpec::new("TyreCoreTemp", FloatArray(4)),
    FieldSpec::new("AirTemp", Float),
    FieldSpec::new("RoadTemp", Float),
    FieldSpec::new("WaterTemp", Float),
    FieldSpec::new("FinalFF", Float),
    FieldSpec::new("KerbVibration", Float),
    FieldSpec::new("SlipVibrations", Float),
    FieldSpec::new("GBibrations", Float),
    FieldSpec::new("ABSVibrations", Float),
    FieldSpec::new("IgnitionOn", Int),
    FieldSpec::new("StarterEngineOn", Int),
    FieldSpec::new("IsEngineRunning", Int),
    FieldSpec::new("FrontBreakCompound", Int),
    FieldSpec::new("RearBreakCompount", Int),
    FieldSpec::new("PadLife", FloatArray(4)),
    FieldSpec::new("DiscLife", FloatArray(4)),
    // Front, rear, left, right, centre
    FieldSpec::new("CarDamage", FloatArray(5)),
];
