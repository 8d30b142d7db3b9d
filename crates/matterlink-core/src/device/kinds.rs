// ── Device kinds ──
//
// Thin typed wrappers over `GenericDevice`. A kind is its descriptor
// groups plus named accessors; everything else lives in the generic
// device, reachable through `Deref`.

use std::ops::Deref;

use crate::binding::BindingDescriptor;
use crate::error::CoreError;
use crate::model::{PropertyType, Value};

use super::GenericDevice;
use super::descriptors::{
    CT, DIMMER, DOOR, ELECTRICITY, MAINTENANCE, SWITCH, TEMPERATURE, VOLUME,
};

/// A device kind: which bindings it declares and how to wrap the result.
pub trait DeviceKind: Deref<Target = GenericDevice> + Sized {
    /// Detected type name this kind is built for.
    const NAME: &'static str;

    /// Descriptor groups, resolved in order.
    fn steps() -> &'static [&'static [BindingDescriptor]];

    fn from_device(device: GenericDevice) -> Self;

    fn device(&self) -> &GenericDevice {
        self
    }
}

macro_rules! device_kind {
    ($(#[$meta:meta])* $kind:ident, $name:literal, [$($group:expr),+ $(,)?]) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $kind(GenericDevice);

        impl DeviceKind for $kind {
            const NAME: &'static str = $name;

            fn steps() -> &'static [&'static [BindingDescriptor]] {
                static STEPS: &[&[BindingDescriptor]] = &[$(&$group),+];
                STEPS
            }

            fn from_device(device: GenericDevice) -> Self {
                Self(device)
            }
        }

        impl Deref for $kind {
            type Target = GenericDevice;

            fn deref(&self) -> &GenericDevice {
                &self.0
            }
        }
    };
}

macro_rules! number_accessors {
    ($property:expr, $get:ident, $set:ident) => {
        pub fn $get(&self) -> Result<Option<f64>, CoreError> {
            self.number($property)
        }

        pub async fn $set(&self, value: f64) -> Result<(), CoreError> {
            self.set($property, Value::Number(value)).await
        }
    };
}

macro_rules! bool_accessors {
    ($property:expr, $get:ident, $set:ident) => {
        pub fn $get(&self) -> Result<Option<bool>, CoreError> {
            self.bool($property)
        }

        pub async fn $set(&self, value: bool) -> Result<(), CoreError> {
            self.set($property, Value::Bool(value)).await
        }
    };
}

// ── Switches and lights ──────────────────────────────────────────────

device_kind!(
    /// Switchable socket.
    Socket, "socket", [SWITCH, MAINTENANCE]
);

impl Socket {
    bool_accessors!(PropertyType::Power, power, set_power);
}

device_kind!(
    /// On/off light.
    Light, "light", [SWITCH, MAINTENANCE]
);

impl Light {
    bool_accessors!(PropertyType::Power, power, set_power);
}

device_kind!(
    /// Dimmable light with optional on/off states.
    Dimmer, "dimmer", [DIMMER, MAINTENANCE]
);

impl Dimmer {
    number_accessors!(PropertyType::Dimmer, dimmer, set_dimmer);
    bool_accessors!(PropertyType::Power, power, set_power);
}

device_kind!(
    /// Color-temperature light.
    Ct, "ct", [CT, ELECTRICITY, MAINTENANCE]
);

impl Ct {
    number_accessors!(PropertyType::Dimmer, dimmer, set_dimmer);
    number_accessors!(PropertyType::Brightness, brightness, set_brightness);
    number_accessors!(PropertyType::Saturation, saturation, set_saturation);
    number_accessors!(PropertyType::Temperature, temperature, set_temperature);
    bool_accessors!(PropertyType::Power, power, set_power);

    pub fn electric_power(&self) -> Result<Option<f64>, CoreError> {
        self.number(PropertyType::ElectricPower)
    }

    pub fn current(&self) -> Result<Option<f64>, CoreError> {
        self.number(PropertyType::Current)
    }

    pub fn voltage(&self) -> Result<Option<f64>, CoreError> {
        self.number(PropertyType::Voltage)
    }

    pub fn consumption(&self) -> Result<Option<f64>, CoreError> {
        self.number(PropertyType::Consumption)
    }

    pub fn frequency(&self) -> Result<Option<f64>, CoreError> {
        self.number(PropertyType::Frequency)
    }
}

// ── Audio ────────────────────────────────────────────────────────────

device_kind!(
    /// Volume of a single player.
    Volume, "volume", [VOLUME, MAINTENANCE]
);

impl Volume {
    number_accessors!(PropertyType::Level, level, set_level);
    bool_accessors!(PropertyType::Mute, mute, set_mute);
}

device_kind!(
    /// Volume of a group of players.
    VolumeGroup, "volumeGroup", [VOLUME, MAINTENANCE]
);

impl VolumeGroup {
    number_accessors!(PropertyType::Level, level, set_level);
    bool_accessors!(PropertyType::Mute, mute, set_mute);
}

// ── Sensors ──────────────────────────────────────────────────────────

device_kind!(
    /// Temperature sensor, optionally with humidity.
    Temperature, "temperature", [TEMPERATURE, MAINTENANCE]
);

impl Temperature {
    pub fn temperature(&self) -> Result<Option<f64>, CoreError> {
        self.number(PropertyType::Temperature)
    }

    pub fn humidity(&self) -> Result<Option<f64>, CoreError> {
        self.number(PropertyType::Humidity)
    }
}

device_kind!(
    /// Door contact. `true` means open.
    Door, "door", [DOOR, MAINTENANCE]
);

impl Door {
    pub fn open_state(&self) -> Result<Option<bool>, CoreError> {
        self.bool(PropertyType::Contact)
    }
}
