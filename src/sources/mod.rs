//! Telemetry source implementations

pub mod lines;

pub use lines::LineSource;
