// ── Shared domain vocabulary ──
//
// Property, value and access kinds agreed on by the device layer and
// the synchronization layer, plus the detected-device description the
// platform hands in.

pub mod detected;
pub mod property;
pub mod value;

pub use detected::{DetectedDevice, DetectedState};
pub use property::{AccessType, PropertyType, ValueType};
pub use value::{StateMeta, Value};
