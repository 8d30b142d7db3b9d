//! Generic device model and Matter synchronization layer.
//!
//! This crate keeps a platform-neutral device representation and a Matter
//! endpoint consistent for as long as the device is active:
//!
//! - **Domain model** ([`model`]) — the [`PropertyType`] / [`ValueType`] /
//!   [`AccessType`] vocabulary shared by the device layer and the
//!   synchronization layer, plus [`DetectedDevice`] as handed in by the
//!   platform's type detection.
//!
//! - **[`StateStore`]** — the seam to the platform's key-value state store
//!   (`describe` / `get` / `set` / `subscribe`). [`MemoryStore`] is a
//!   `DashMap`-backed in-process implementation.
//!
//! - **[`GenericDevice`]** — a named aggregate of [`StateBinding`]s built from
//!   declarative [`BindingDescriptor`] groups. Device kinds ([`device::kinds`])
//!   are thin typed wrappers; [`create_device`] picks one from the detected type.
//!
//! - **Synchronization** ([`sync`]) — [`SyncHandler`] projects a device property
//!   onto a Matter [`Endpoint`], shaped by [`RootNode`] or [`BridgedNode`].
//!
//! - **[`SyncSession`]** — owns attached handlers and the keep-alive timer that
//!   periodically re-subscribes to the backend status feed.

pub mod binding;
pub mod device;
pub mod error;
pub mod model;
pub mod session;
pub mod store;
pub mod sync;

// ── Primary re-exports ──────────────────────────────────────────────
pub use binding::{BindingDescriptor, BindingRole, StateBinding};
pub use device::catalog::{Device, DeviceType, create_device};
pub use device::{ChangeListener, DeviceBuilder, DeviceEvent, GenericDevice};
pub use error::CoreError;
pub use model::{AccessType, DetectedDevice, DetectedState, PropertyType, StateMeta, Value, ValueType};
pub use session::{BackendUpdate, SessionConfig, StatusSource, SubscribeAck, SyncSession};
pub use store::{MemoryStore, StateListener, StateStore, StoreError, SubscriptionId};
pub use sync::{
    AttributePatch, BridgedNode, Endpoint, EndpointError, EndpointShape, Maintenance, Projection,
    Reachability, RootNode, SyncHandler, SyncStatus,
};
