//! Configuration side of matterlink.
//!
//! - **[`MatterConfig`]** — the persisted controller / bridge / device
//!   configuration, normalized from legacy shapes on load.
//! - **[`ConfigTracker`]** — remembers the last loaded or saved snapshot to
//!   answer "does this candidate differ?", and tracks per-entity
//!   commissioning status.
//! - **[`ConfigBackend`]** — where the configuration lives: a key in the
//!   platform state store ([`StoreBackend`]) or a TOML file ([`FileBackend`]).
//! - **[`Settings`]** — process settings loaded with figment from defaults,
//!   `matterlink.toml` and `MATTERLINK_*` environment variables.

pub mod backend;
pub mod error;
pub mod model;
pub mod settings;
pub mod tracker;

pub use backend::{ConfigBackend, FileBackend, StoreBackend};
pub use error::ConfigError;
pub use model::{
    BridgeConfig, Commissioning, CommissioningStatus, CommissioningUpdate, ControllerSettings,
    DeviceConfig, EntityKind, MatterConfig,
};
pub use settings::{Settings, settings_path};
pub use tracker::ConfigTracker;
