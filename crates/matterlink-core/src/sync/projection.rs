// ── Property projections ──

use super::{AttributePatch, EndpointShape};
use crate::model::{PropertyType, Value};

/// Translation of one device property into endpoint attributes.
pub trait Projection: Send + Sync + 'static {
    /// The property this projection watches.
    fn property(&self) -> PropertyType;

    /// Patch for a property value, or `None` if nothing should be written.
    fn project(&self, value: Option<&Value>) -> Option<AttributePatch>;
}

/// `Unreachable` projected as the node's `reachable` attribute.
///
/// An unknown value counts as reachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reachability<S> {
    shape: S,
}

impl<S: EndpointShape> Reachability<S> {
    pub fn new(shape: S) -> Self {
        Self { shape }
    }
}

impl<S: EndpointShape> Projection for Reachability<S> {
    fn property(&self) -> PropertyType {
        PropertyType::Unreachable
    }

    fn project(&self, value: Option<&Value>) -> Option<AttributePatch> {
        let unreachable = value.and_then(Value::as_bool).unwrap_or(false);
        Some(self.shape.reachable(!unreachable))
    }
}

// powerSource.batChargeLevel: 0 ok, 1 warning, 2 critical
const BAT_CHARGE_OK: u8 = 0;
const BAT_CHARGE_CRITICAL: u8 = 2;

/// `LowBattery` projected as the power source's battery charge level.
#[derive(Debug, Clone, Copy, Default)]
pub struct Maintenance;

impl Projection for Maintenance {
    fn property(&self) -> PropertyType {
        PropertyType::LowBattery
    }

    fn project(&self, value: Option<&Value>) -> Option<AttributePatch> {
        let low = value?.as_bool()?;
        let level = if low { BAT_CHARGE_CRITICAL } else { BAT_CHARGE_OK };
        Some(AttributePatch::new().with("powerSource", "batChargeLevel", level))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::sync::{BridgedNode, RootNode};

    #[test]
    fn reachability_negates_unreachable() {
        let root = Reachability::new(RootNode);
        let patch = root.project(Some(&Value::Bool(true)));
        assert_eq!(
            patch.and_then(|p| p.get("basicInformation", "reachable").cloned()),
            Some(json!(false))
        );

        let bridged = Reachability::new(BridgedNode);
        let patch = bridged.project(Some(&Value::Bool(false)));
        assert_eq!(
            patch.and_then(|p| p.get("bridgedDeviceBasicInformation", "reachable").cloned()),
            Some(json!(true))
        );
    }

    #[test]
    fn unknown_reachability_counts_as_reachable() {
        let patch = Reachability::new(RootNode).project(None);
        assert_eq!(
            patch.and_then(|p| p.get("basicInformation", "reachable").cloned()),
            Some(json!(true))
        );
    }

    #[test]
    fn maintenance_maps_low_battery() {
        let low = Maintenance.project(Some(&Value::Bool(true)));
        assert_eq!(
            low.and_then(|p| p.get("powerSource", "batChargeLevel").cloned()),
            Some(json!(2))
        );
        let ok = Maintenance.project(Some(&Value::Bool(false)));
        assert_eq!(
            ok.and_then(|p| p.get("powerSource", "batChargeLevel").cloned()),
            Some(json!(0))
        );
        assert!(Maintenance.project(None).is_none());
    }
}
