// ── Binding descriptor groups ──
//
// Role names match what the platform's type detector reports. Within a
// group the actual binding is listed before its set counterpart.

use crate::binding::BindingDescriptor;
use crate::model::{AccessType, PropertyType, ValueType};

const fn flag(name: &'static str, property: PropertyType) -> BindingDescriptor {
    BindingDescriptor::new(name, property, ValueType::Boolean, AccessType::Read)
}

const fn reading(name: &'static str, property: PropertyType) -> BindingDescriptor {
    BindingDescriptor::new(name, property, ValueType::Number, AccessType::Read)
}

/// Shared by every kind; all optional.
pub static MAINTENANCE: [BindingDescriptor; 6] = [
    flag("UNREACH", PropertyType::Unreachable),
    flag("LOWBAT", PropertyType::LowBattery),
    flag("MAINTAIN", PropertyType::Maintenance),
    flag("WORKING", PropertyType::Working),
    flag("ERROR", PropertyType::Error),
    BindingDescriptor::new(
        "DIRECTION",
        PropertyType::Direction,
        ValueType::Enum,
        AccessType::Read,
    ),
];

pub static ELECTRICITY: [BindingDescriptor; 5] = [
    reading("ELECTRIC_POWER", PropertyType::ElectricPower),
    reading("CURRENT", PropertyType::Current),
    reading("VOLTAGE", PropertyType::Voltage),
    reading("CONSUMPTION", PropertyType::Consumption),
    reading("FREQUENCY", PropertyType::Frequency),
];

pub static SWITCH: [BindingDescriptor; 2] = [
    BindingDescriptor::new(
        "ON_ACTUAL",
        PropertyType::Power,
        ValueType::Boolean,
        AccessType::Read,
    )
    .actual(),
    BindingDescriptor::new(
        "ON",
        PropertyType::Power,
        ValueType::Boolean,
        AccessType::ReadWrite,
    )
    .required(),
];

pub static DIMMER: [BindingDescriptor; 4] = [
    BindingDescriptor::new(
        "ACTUAL",
        PropertyType::Dimmer,
        ValueType::NumberPercent,
        AccessType::Read,
    )
    .actual(),
    BindingDescriptor::new(
        "SET",
        PropertyType::Dimmer,
        ValueType::NumberPercent,
        AccessType::ReadWrite,
    )
    .required(),
    BindingDescriptor::new(
        "ON_ACTUAL",
        PropertyType::Power,
        ValueType::Boolean,
        AccessType::Read,
    )
    .actual(),
    BindingDescriptor::new(
        "ON_SET",
        PropertyType::Power,
        ValueType::Boolean,
        AccessType::ReadWrite,
    ),
];

pub static CT: [BindingDescriptor; 6] = [
    BindingDescriptor::new(
        "DIMMER",
        PropertyType::Dimmer,
        ValueType::NumberPercent,
        AccessType::ReadWrite,
    ),
    BindingDescriptor::new(
        "BRIGHTNESS",
        PropertyType::Brightness,
        ValueType::NumberPercent,
        AccessType::ReadWrite,
    ),
    BindingDescriptor::new(
        "SATURATION",
        PropertyType::Saturation,
        ValueType::NumberPercent,
        AccessType::ReadWrite,
    ),
    BindingDescriptor::new(
        "TEMPERATURE",
        PropertyType::Temperature,
        ValueType::NumberMinMax,
        AccessType::ReadWrite,
    )
    .required(),
    BindingDescriptor::new(
        "ON_ACTUAL",
        PropertyType::Power,
        ValueType::Boolean,
        AccessType::Read,
    )
    .actual(),
    BindingDescriptor::new(
        "ON",
        PropertyType::Power,
        ValueType::Boolean,
        AccessType::ReadWrite,
    ),
];

/// Level with separate set/actual states plus mute. Used by both volume kinds.
pub static VOLUME: [BindingDescriptor; 3] = [
    BindingDescriptor::new(
        "SET",
        PropertyType::Level,
        ValueType::NumberMinMax,
        AccessType::ReadWrite,
    )
    .required(),
    BindingDescriptor::new(
        "ACTUAL",
        PropertyType::Level,
        ValueType::NumberMinMax,
        AccessType::Read,
    )
    .actual(),
    BindingDescriptor::new(
        "MUTE",
        PropertyType::Mute,
        ValueType::Boolean,
        AccessType::ReadWrite,
    ),
];

pub static TEMPERATURE: [BindingDescriptor; 2] = [
    BindingDescriptor::new(
        "ACTUAL",
        PropertyType::Temperature,
        ValueType::Number,
        AccessType::Read,
    )
    .required(),
    BindingDescriptor::new(
        "SECOND",
        PropertyType::Humidity,
        ValueType::NumberPercent,
        AccessType::Read,
    ),
];

pub static DOOR: [BindingDescriptor; 1] = [BindingDescriptor::new(
    "ACTUAL",
    PropertyType::Contact,
    ValueType::Boolean,
    AccessType::Read,
)
.required()];
