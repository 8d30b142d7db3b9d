// ── Process settings ──
//
// Layered with figment: built-in defaults, then `matterlink.toml`, then
// `MATTERLINK_*` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use matterlink_core::SessionConfig;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Adapter instance number; the store prefix is `matter.<instance>`.
    #[serde(default)]
    pub instance: u32,

    /// Name used when subscribing to the backend status feed.
    #[serde(default = "default_client_name")]
    pub client_name: String,

    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u64,

    #[serde(default = "default_restart_delay")]
    pub restart_delay_secs: u64,

    /// Bridge configuration file for the file backend.
    #[serde(default)]
    pub config_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            instance: 0,
            client_name: default_client_name(),
            keepalive_secs: default_keepalive(),
            restart_delay_secs: default_restart_delay(),
            config_file: None,
        }
    }
}

fn default_client_name() -> String {
    "gui".into()
}
fn default_keepalive() -> u64 {
    60
}
fn default_restart_delay() -> u64 {
    5
}

impl Settings {
    /// Load from the canonical settings path and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&settings_path())
    }

    /// Load from an explicit file and the environment. A missing file is
    /// not an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let settings: Self = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("MATTERLINK_"))
            .extract()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.keepalive_secs == 0 {
            return Err(ConfigError::Validation {
                field: "keepalive_secs".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Key prefix of this instance in the state store.
    pub fn store_prefix(&self) -> String {
        format!("matter.{}", self.instance)
    }

    /// Bridge configuration file, defaulting to the platform data dir.
    pub fn config_file(&self) -> PathBuf {
        self.config_file.clone().unwrap_or_else(|| {
            project_dirs().map_or_else(
                || PathBuf::from("matter.toml"),
                |dirs| dirs.data_dir().join("matter.toml"),
            )
        })
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            keepalive_interval: Duration::from_secs(self.keepalive_secs),
            restart_delay: Duration::from_secs(self.restart_delay_secs),
            client_name: self.client_name.clone(),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "matterlink", "matterlink")
}

/// Resolve the settings file path via XDG / platform conventions.
pub fn settings_path() -> PathBuf {
    project_dirs().map_or_else(
        || PathBuf::from("matterlink.toml"),
        |dirs| dirs.config_dir().join("matterlink.toml"),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matterlink.toml");
        std::fs::write(&path, "instance = 2\nkeepalive_secs = 30\n").unwrap();

        let settings = Settings::load_from(&path).unwrap();

        assert_eq!(settings.store_prefix(), "matter.2");
        assert_eq!(settings.session_config().keepalive_interval, Duration::from_secs(30));
        assert_eq!(settings.session_config().restart_delay, Duration::from_secs(5));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn zero_keepalive_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matterlink.toml");
        std::fs::write(&path, "keepalive_secs = 0\n").unwrap();

        assert!(matches!(
            Settings::load_from(&path),
            Err(ConfigError::Validation { .. })
        ));
    }
}
