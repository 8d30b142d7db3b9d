// ── Persisted configuration ──
//
// Shape of the controller / bridge / device configuration as stored by
// the platform. Older versions wrapped lists as `{ "list": [...] }` and
// could omit whole sections; both are accepted on load and written back
// in the current shape. Fields this crate does not know are kept.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;

type Extra = serde_json::Map<String, serde_json::Value>;

// ── Configuration document ──────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatterConfig {
    #[serde(default, deserialize_with = "null_as_default")]
    pub controller: ControllerSettings,

    #[serde(default, deserialize_with = "list_or_wrapper")]
    pub bridges: Vec<BridgeConfig>,

    #[serde(default, deserialize_with = "list_or_wrapper")]
    pub devices: Vec<DeviceConfig>,

    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(flatten)]
    pub extra: Extra,
}

/// A bridge exposing several platform devices as one Matter node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub uuid: String,

    #[serde(default)]
    pub name: String,

    #[serde(default = "enabled_by_default")]
    pub enabled: bool,

    #[serde(rename = "vendorID", default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<String>,

    #[serde(rename = "productID", default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,

    /// Bridged devices.
    #[serde(rename = "list", default, deserialize_with = "list_or_wrapper")]
    pub devices: Vec<DeviceConfig>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// A platform device exposed on its own or behind a bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub uuid: String,

    #[serde(default)]
    pub name: String,

    /// Platform object id the device was detected from.
    #[serde(default)]
    pub oid: String,

    /// Detected type name.
    #[serde(rename = "type", default)]
    pub device_type: String,

    #[serde(default = "enabled_by_default")]
    pub enabled: bool,

    /// Created by automatic detection rather than by hand.
    #[serde(default)]
    pub auto: bool,

    #[serde(rename = "vendorID", default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<String>,

    #[serde(rename = "productID", default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

fn enabled_by_default() -> bool {
    true
}

impl MatterConfig {
    /// Parse a raw document, normalizing legacy shapes.
    pub fn from_value(raw: serde_json::Value) -> Result<Self, ConfigError> {
        if raw.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(raw)?)
    }

    pub fn to_value(&self) -> Result<serde_json::Value, ConfigError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Check that every bridge and device uuid is present, unique and free
    /// of dots. Bridged devices only need to be unique within their bridge.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let top_level = self
            .bridges
            .iter()
            .map(|b| b.uuid.as_str())
            .chain(self.devices.iter().map(|d| d.uuid.as_str()));
        check_uuids("uuid", top_level)?;

        for bridge in &self.bridges {
            check_uuids(
                &format!("bridge {} device uuid", bridge.uuid),
                bridge.devices.iter().map(|d| d.uuid.as_str()),
            )?;
        }
        Ok(())
    }

    pub fn bridge(&self, uuid: &str) -> Option<&BridgeConfig> {
        self.bridges.iter().find(|b| b.uuid == uuid)
    }

    pub fn device(&self, uuid: &str) -> Option<&DeviceConfig> {
        self.devices.iter().find(|d| d.uuid == uuid)
    }
}

fn check_uuids<'a>(field: &str, uuids: impl Iterator<Item = &'a str>) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for uuid in uuids {
        if uuid.is_empty() {
            return Err(ConfigError::Validation {
                field: field.into(),
                reason: "must not be empty".into(),
            });
        }
        if uuid.contains('.') {
            return Err(ConfigError::Validation {
                field: field.into(),
                reason: format!("'{uuid}' must not contain '.'"),
            });
        }
        if !seen.insert(uuid) {
            return Err(ConfigError::DuplicateUuid { uuid: uuid.into() });
        }
    }
    Ok(())
}

// ── Legacy shape handling ───────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged, bound(deserialize = "T: Deserialize<'de>"))]
enum ListShape<T> {
    Plain(Vec<T>),
    Wrapped {
        #[serde(default)]
        list: Vec<T>,
    },
}

/// Accept `[...]`, `{ "list": [...] }` or `null`.
fn list_or_wrapper<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(
        match Option::<ListShape<T>>::deserialize(deserializer)? {
            Some(ListShape::Plain(list) | ListShape::Wrapped { list }) => list,
            None => Vec::new(),
        },
    )
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ── Commissioning ───────────────────────────────────────────────────

/// Commissioning state of one bridge or device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissioningStatus {
    pub commissioned: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,

    /// Labels of the fabrics the node is commissioned into.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fabrics: Vec<String>,
}

impl CommissioningStatus {
    pub fn commissioned(commissioned: bool) -> Self {
        Self {
            commissioned,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commissioning {
    #[serde(default)]
    pub bridges: BTreeMap<String, CommissioningStatus>,
    #[serde(default)]
    pub devices: BTreeMap<String, CommissioningStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Bridge,
    Device,
}

/// An externally reported commissioning change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommissioningUpdate {
    pub kind: EntityKind,
    pub uuid: String,
    pub status: CommissioningStatus,
}

impl Commissioning {
    pub fn apply(&mut self, update: CommissioningUpdate) {
        let map = match update.kind {
            EntityKind::Bridge => &mut self.bridges,
            EntityKind::Device => &mut self.devices,
        };
        map.insert(update.uuid, update.status);
    }

    pub fn is_commissioned(&self, kind: EntityKind, uuid: &str) -> bool {
        let map = match kind {
            EntityKind::Bridge => &self.bridges,
            EntityKind::Device => &self.devices,
        };
        map.get(uuid).is_some_and(|s| s.commissioned)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn legacy_wrapped_lists_are_unwrapped() {
        let config = MatterConfig::from_value(json!({
            "controller": null,
            "bridges": { "list": [
                { "uuid": "b1", "name": "Living room", "list": { "list": [
                    { "uuid": "d1", "oid": "alias.0.lamp", "type": "dimmer" }
                ] } }
            ] },
            "devices": { "list": [] }
        }))
        .unwrap();

        assert!(!config.controller.enabled);
        assert_eq!(config.bridges.len(), 1);
        assert_eq!(config.bridges[0].devices[0].device_type, "dimmer");
        assert!(config.bridges[0].enabled);
        assert!(config.devices.is_empty());
    }

    #[test]
    fn empty_wrapper_yields_empty_list() {
        let config = MatterConfig::from_value(json!({
            "bridges": [{ "uuid": "b1", "list": {} }],
            "devices": {}
        }))
        .unwrap();
        assert!(config.bridges[0].devices.is_empty());
        assert!(config.devices.is_empty());
    }

    #[test]
    fn missing_sections_default() {
        let config = MatterConfig::from_value(json!({})).unwrap();
        assert_eq!(config, MatterConfig::default());
        assert_eq!(MatterConfig::from_value(serde_json::Value::Null).unwrap(), config);
    }

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let raw = json!({
            "controller": { "enabled": true, "defaultExposeMatterApplianceType": "x" },
            "bridges": [],
            "devices": [{ "uuid": "d1", "type": "socket", "noComposed": true, "vendorID": "0xFFF1" }],
            "schemaVersion": 2
        });
        let config = MatterConfig::from_value(raw).unwrap();
        let written = config.to_value().unwrap();

        assert_eq!(written["schemaVersion"], json!(2));
        assert_eq!(written["controller"]["defaultExposeMatterApplianceType"], json!("x"));
        assert_eq!(written["devices"][0]["noComposed"], json!(true));
        assert_eq!(written["devices"][0]["vendorID"], json!("0xFFF1"));
        assert_eq!(MatterConfig::from_value(written).unwrap(), config);
    }

    #[test]
    fn duplicate_uuids_across_bridges_and_devices_are_rejected() {
        let config = MatterConfig::from_value(json!({
            "bridges": [{ "uuid": "same" }],
            "devices": [{ "uuid": "same" }]
        }))
        .unwrap();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateUuid { ref uuid }) if uuid == "same"
        ));
    }

    #[test]
    fn dotted_uuids_are_rejected() {
        let config = MatterConfig::from_value(json!({ "devices": [{ "uuid": "a.b" }] })).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn commissioning_updates_replace_entries() {
        let mut commissioning = Commissioning::default();
        commissioning.apply(CommissioningUpdate {
            kind: EntityKind::Bridge,
            uuid: "b1".into(),
            status: CommissioningStatus::commissioned(true),
        });

        assert!(commissioning.is_commissioned(EntityKind::Bridge, "b1"));
        assert!(!commissioning.is_commissioned(EntityKind::Device, "b1"));
    }
}
