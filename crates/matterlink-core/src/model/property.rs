// ── Property taxonomy ──
//
// Closed vocabulary of semantic properties and value kinds. Names are
// stable camelCase strings so they can round-trip through logs and
// configuration.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::value::{StateMeta, Value};

/// Semantic property of a device, independent of the state it is stored in.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum PropertyType {
    Power,
    Level,
    Dimmer,
    Brightness,
    Saturation,
    Hue,
    Temperature,
    Humidity,
    Mute,
    Contact,
    // Maintenance
    Unreachable,
    LowBattery,
    Maintenance,
    Working,
    Error,
    Direction,
    // Electricity data
    ElectricPower,
    Current,
    Voltage,
    Consumption,
    Frequency,
}

/// Representation of a property's value in the state store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ValueType {
    Boolean,
    /// Number in `0..=100`.
    NumberPercent,
    /// Number bounded by the state's declared `min`/`max` (default `0..=100`).
    NumberMinMax,
    Number,
    /// Number that must be one of the state's declared `states`.
    Enum,
    String,
}

impl ValueType {
    /// Coerce a raw store value into this value kind.
    ///
    /// Returns `None` for `null` and for values that have no sensible
    /// interpretation (e.g. `"abc"` for a number).
    pub fn coerce(self, raw: &serde_json::Value) -> Option<Value> {
        use serde_json::Value as Raw;

        match (self, raw) {
            (_, Raw::Null) => None,

            (Self::Boolean, Raw::Bool(b)) => Some(Value::Bool(*b)),
            (Self::Boolean, Raw::Number(n)) => n.as_f64().map(|n| Value::Bool(n != 0.0)),
            (Self::Boolean, Raw::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "on" | "1" => Some(Value::Bool(true)),
                "false" | "off" | "0" => Some(Value::Bool(false)),
                _ => None,
            },

            (Self::String, Raw::String(s)) => Some(Value::Text(s.clone())),
            (Self::String, Raw::Bool(b)) => Some(Value::Text(b.to_string())),
            (Self::String, Raw::Number(n)) => Some(Value::Text(n.to_string())),

            (_, Raw::Number(n)) if self.is_numeric() => n.as_f64().map(Value::Number),
            (_, Raw::String(s)) if self.is_numeric() => {
                s.trim().parse::<f64>().ok().filter(|n| n.is_finite()).map(Value::Number)
            }

            _ => None,
        }
    }

    /// Check that `value` satisfies this value kind's type and range.
    pub fn validate(self, value: &Value, meta: &StateMeta) -> Result<(), String> {
        match (self, value) {
            (Self::Boolean, Value::Bool(_)) | (Self::String, Value::Text(_)) => Ok(()),

            (Self::NumberPercent, Value::Number(n)) => check_range(*n, 0.0, 100.0),
            (Self::NumberMinMax, Value::Number(n)) => {
                check_range(*n, meta.min.unwrap_or(0.0), meta.max.unwrap_or(100.0))
            }
            (Self::Number, Value::Number(n)) => {
                if n.is_finite() {
                    Ok(())
                } else {
                    Err(format!("{n} is not a finite number"))
                }
            }
            (Self::Enum, Value::Number(n)) => {
                if meta.states.is_empty() || meta.has_state(*n) {
                    Ok(())
                } else {
                    Err(format!("{n} is not one of the declared states"))
                }
            }

            (kind, other) => Err(format!("expected {kind}, got {}", other.kind_name())),
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::NumberPercent | Self::NumberMinMax | Self::Number | Self::Enum
        )
    }
}

fn check_range(n: f64, min: f64, max: f64) -> Result<(), String> {
    if n.is_finite() && n >= min && n <= max {
        Ok(())
    } else {
        Err(format!("{n} is outside {min}..={max}"))
    }
}

/// Whether a binding may be read, written, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum AccessType {
    Read,
    Write,
    ReadWrite,
}

impl AccessType {
    pub fn is_readable(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    pub fn is_writable(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}
