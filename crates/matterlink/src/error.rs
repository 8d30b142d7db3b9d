//! CLI error types with miette diagnostics.
//!
//! Maps core and configuration errors into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use matterlink_config::ConfigError;
use matterlink_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────
    #[error("Could not load configuration from {path}")]
    #[diagnostic(
        code(matterlink::load_failed),
        help("{reason}\nCheck the file syntax; legacy JSON documents can be converted with: matterlink config normalize <file>")
    )]
    LoadFailed { path: String, reason: String },

    #[error("Could not save configuration to {path}")]
    #[diagnostic(code(matterlink::save_failed), help("{reason}"))]
    SaveFailed { path: String, reason: String },

    #[error("uuid '{uuid}' is used more than once")]
    #[diagnostic(
        code(matterlink::duplicate_uuid),
        help("Bridges and top-level devices must have distinct uuids.")
    )]
    DuplicateUuid { uuid: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(matterlink::validation))]
    Validation { field: String, reason: String },

    #[error("File not found: {path}")]
    #[diagnostic(code(matterlink::not_found))]
    NotFound { path: String },

    #[error(transparent)]
    #[diagnostic(code(matterlink::config))]
    Config(ConfigError),

    // ── Devices / synchronization ────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(matterlink::core))]
    Core(#[from] CoreError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON document: {0}")]
    #[diagnostic(code(matterlink::json))]
    Json(#[from] serde_json::Error),

    #[error("Invalid TOML document: {0}")]
    #[diagnostic(code(matterlink::toml))]
    Toml(#[from] toml::de::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::DuplicateUuid { .. } => exit_code::CONFLICT,
            Self::Validation { .. } => exit_code::USAGE,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::DuplicateUuid { uuid } => Self::DuplicateUuid { uuid },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_keep_their_exit_codes() {
        let dup: CliError = ConfigError::DuplicateUuid { uuid: "a".into() }.into();
        assert_eq!(dup.exit_code(), exit_code::CONFLICT);

        let invalid: CliError = ConfigError::Validation {
            field: "uuid".into(),
            reason: "must not be empty".into(),
        }
        .into();
        assert_eq!(invalid.exit_code(), exit_code::USAGE);

        let other: CliError = ConfigError::Destroyed.into();
        assert_eq!(other.exit_code(), exit_code::GENERAL);
    }
}
