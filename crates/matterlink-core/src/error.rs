// ── Core error types ──
//
// Errors raised by bindings, devices and the synchronization layer.
// Store failures are wrapped through `From<StoreError>`; endpoint
// failures are flattened into `ProjectionFailed` so callers never
// depend on the protocol engine's own error type.

use thiserror::Error;

use crate::model::PropertyType;
use crate::store::StoreError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Binding / device errors ──────────────────────────────────────
    #[error("Property {property} is not bound on device {device}")]
    PropertyNotBound {
        device: String,
        property: PropertyType,
    },

    #[error("State {key} does not accept writes")]
    AccessDenied { key: String },

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Device {device} has been destroyed")]
    DeviceDestroyed { device: String },

    #[error("Unsupported device type: {type_name}")]
    UnsupportedDeviceType { type_name: String },

    // ── Synchronization errors ───────────────────────────────────────
    #[error("Projection of {property} onto the endpoint failed: {reason}")]
    ProjectionFailed {
        property: PropertyType,
        reason: String,
    },

    #[error("Synchronization session is closed")]
    SessionClosed,

    #[error("Status subscription failed: {message}")]
    Subscription { message: String },

    // ── State store errors (wrapped) ─────────────────────────────────
    #[error("State store error: {0}")]
    Store(#[from] StoreError),
}
