// ── Detected platform devices ──
//
// What the platform's type detection reports for one physical device:
// a type name plus a list of role names (`ON`, `ON_ACTUAL`, `DIMMER`,
// `UNREACH`, ...) mapped to the store keys that hold them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedDevice {
    /// Platform id of the device (channel or device object).
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Detected type name, e.g. `"dimmer"` or `"volumeGroup"`.
    #[serde(rename = "type")]
    pub device_type: String,
    #[serde(default)]
    pub states: Vec<DetectedState>,
}

/// One role of a detected device. `id` is `None` when the detector knows the
/// role but found no matching state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedState {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
}

impl DetectedDevice {
    pub fn new(id: impl Into<String>, device_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            device_type: device_type.into(),
            states: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a role mapped to a store key.
    pub fn with_state(mut self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.states.push(DetectedState {
            name: name.into(),
            id: Some(id.into()),
        });
        self
    }

    /// Store key for a role name, if the detector found one.
    pub fn state_id(&self, name: &str) -> Option<&str> {
        self.states
            .iter()
            .find(|s| s.name == name)
            .and_then(|s| s.id.as_deref())
    }

    /// Display name, falling back to the last segment of the id.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .unwrap_or_else(|| self.id.rsplit('.').next().unwrap_or(&self.id))
    }
}
