// ── Kind catalog ──
//
// Maps detected type names onto device kinds.

use std::str::FromStr;
use std::sync::Arc;

use strum::{Display, EnumIter, EnumString};

use super::GenericDevice;
use super::kinds::{Ct, DeviceKind, Dimmer, Door, Light, Socket, Temperature, Volume, VolumeGroup};
use crate::error::CoreError;
use crate::model::DetectedDevice;
use crate::store::StateStore;

/// Detected type names with a device kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "camelCase")]
pub enum DeviceType {
    Socket,
    Light,
    Dimmer,
    Ct,
    Volume,
    VolumeGroup,
    Temperature,
    Door,
}

/// A device of any supported kind.
#[derive(Debug, Clone)]
pub enum Device {
    Socket(Socket),
    Light(Light),
    Dimmer(Dimmer),
    Ct(Ct),
    Volume(Volume),
    VolumeGroup(VolumeGroup),
    Temperature(Temperature),
    Door(Door),
}

impl Device {
    pub fn generic(&self) -> &GenericDevice {
        match self {
            Self::Socket(d) => d.device(),
            Self::Light(d) => d.device(),
            Self::Dimmer(d) => d.device(),
            Self::Ct(d) => d.device(),
            Self::Volume(d) => d.device(),
            Self::VolumeGroup(d) => d.device(),
            Self::Temperature(d) => d.device(),
            Self::Door(d) => d.device(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        self.generic().kind()
    }
}

/// Build the device kind matching `detected.device_type`.
pub async fn create_device(
    detected: &DetectedDevice,
    store: Arc<dyn StateStore>,
) -> Result<Device, CoreError> {
    let device_type = DeviceType::from_str(&detected.device_type).map_err(|_| {
        CoreError::UnsupportedDeviceType {
            type_name: detected.device_type.clone(),
        }
    })?;

    let device = match device_type {
        DeviceType::Socket => Device::Socket(open::<Socket>(detected, store).await),
        DeviceType::Light => Device::Light(open::<Light>(detected, store).await),
        DeviceType::Dimmer => Device::Dimmer(open::<Dimmer>(detected, store).await),
        DeviceType::Ct => Device::Ct(open::<Ct>(detected, store).await),
        DeviceType::Volume => Device::Volume(open::<Volume>(detected, store).await),
        DeviceType::VolumeGroup => {
            Device::VolumeGroup(open::<VolumeGroup>(detected, store).await)
        }
        DeviceType::Temperature => {
            Device::Temperature(open::<Temperature>(detected, store).await)
        }
        DeviceType::Door => Device::Door(open::<Door>(detected, store).await),
    };
    Ok(device)
}

async fn open<K: DeviceKind>(detected: &DetectedDevice, store: Arc<dyn StateStore>) -> K {
    GenericDevice::open::<K>(detected, store).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn type_names_match_kind_names() {
        let names: Vec<String> = DeviceType::iter().map(|t| t.to_string()).collect();
        assert_eq!(
            names,
            ["socket", "light", "dimmer", "ct", "volume", "volumeGroup", "temperature", "door"]
        );
        assert_eq!(VolumeGroup::NAME, DeviceType::VolumeGroup.to_string());
        assert_eq!(Ct::NAME, DeviceType::Ct.to_string());
    }

    #[tokio::test]
    async fn unknown_type_is_rejected() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let detected = DetectedDevice::new("x", "vacuumCleaner");

        let err = create_device(&detected, store).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::UnsupportedDeviceType { ref type_name } if type_name == "vacuumCleaner"
        ));
    }

    #[tokio::test]
    async fn dispatches_on_detected_type() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let detected = DetectedDevice::new("x", "volumeGroup");

        let device = create_device(&detected, store).await.unwrap();
        assert!(matches!(device, Device::VolumeGroup(_)));
        assert_eq!(device.kind_name(), "volumeGroup");
    }
}
