//! Telemetry field value definitions

use serde::{Deserialize, Serialize};

/// Schema type of a telemetry field.
///
/// Every field in a per-kind schema declares one of these. Raw values are
/// coerced to the declared type during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Signed integer (also used for simulator enums and 0/1 flags)
    Int,
    /// Finite floating point
    Float,
    /// Boolean
    Bool,
    /// UTF-8 text
    Text,
    /// Fixed-length float array (per-wheel data, vectors)
    FloatArray(usize),
}

impl FieldType {
    /// Default value substituted for missing or malformed fields.
    pub fn default_value(&self) -> Value {
        match self {
            FieldType::Int => Value::Int(0),
            FieldType::Float => Value::Float(0.0),
            FieldType::Bool => Value::Bool(false),
            FieldType::Text => Value::Text(String::new()),
            FieldType::FloatArray(len) => Value::Array(vec![Value::Float(0.0); *len]),
        }
    }

    /// Coerce a raw value to this type.
    ///
    /// Returns `None` when the value cannot be represented, in which case the
    /// caller substitutes [`FieldType::default_value`].
    pub fn coerce(&self, raw: &Value) -> Option<Value> {
        match (self, raw) {
            (FieldType::Int, Value::Int(v)) => Some(Value::Int(*v)),
            (FieldType::Int, Value::Bool(b)) => Some(Value::Int(i64::from(*b))),
            (FieldType::Int, Value::Float(f)) => {
                // Only integral floats inside the i64 range convert cleanly
                if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                    Some(Value::Int(*f as i64))
                } else {
                    None
                }
            }
            (FieldType::Float, Value::Float(f)) if f.is_finite() => Some(Value::Float(*f)),
            (FieldType::Float, Value::Int(v)) => Some(Value::Float(*v as f64)),
            (FieldType::Bool, Value::Bool(b)) => Some(Value::Bool(*b)),
            (FieldType::Bool, Value::Int(v)) => Some(Value::Bool(*v != 0)),
            (FieldType::Text, Value::Text(s)) => Some(Value::Text(s.clone())),
            (FieldType::FloatArray(len), Value::Array(items)) => {
                if items.len() != *len {
                    return None;
                }
                items
                    .iter()
                    .map(|item| FieldType::Float.coerce(item))
                    .collect::<Option<Vec<_>>>()
                    .map(Value::Array)
            }
            _ => None,
        }
    }
}

/// Runtime value of a telemetry field.
///
/// Serializes to the bare JSON scalar or array, so a snapshot's fields
/// flatten directly into the wire payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Array(Vec<Value>),
}

impl Value {
    /// Integer view of the value, if it is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Float view of the value; integers widen.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Text view of the value, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<const N: usize> From<[f32; N]> for Value {
    fn from(v: [f32; N]) -> Self {
        Value::Array(v.iter().map(|f| Value::Float(f64::from(*f))).collect())
    }
}
