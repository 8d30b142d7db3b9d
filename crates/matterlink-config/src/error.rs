// ── Error ───────────────────────────────────────────────────────────

use thiserror::Error;

use matterlink_core::StoreError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {reason}")]
    LoadFailed { reason: String },

    #[error("failed to save configuration: {reason}")]
    SaveFailed { reason: String },

    #[error("uuid '{uuid}' is used more than once")]
    DuplicateUuid { uuid: String },

    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("configuration tracker has been destroyed")]
    Destroyed,

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("state store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}
