// ── Configuration backends ──
//
// Where the configuration document and commissioning status live.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use matterlink_core::{StateStore, ValueType};

use crate::error::ConfigError;
use crate::model::{Commissioning, CommissioningStatus, MatterConfig};

#[async_trait]
pub trait ConfigBackend: Send + Sync {
    /// Raw configuration document; `null` if nothing has been saved yet.
    async fn load(&self) -> Result<serde_json::Value, ConfigError>;

    async fn save(&self, config: &MatterConfig) -> Result<(), ConfigError>;

    /// Commissioning status of the bridges and devices in `config`.
    async fn commissioning(&self, config: &MatterConfig) -> Result<Commissioning, ConfigError>;
}

// ── State store ─────────────────────────────────────────────────────

/// Configuration kept in the platform state store.
///
/// The document lives under `<prefix>.config`; commissioning flags under
/// `<prefix>.bridges.<uuid>.commissioned` and
/// `<prefix>.devices.<uuid>.commissioned`.
pub struct StoreBackend {
    store: Arc<dyn StateStore>,
    prefix: String,
}

impl StoreBackend {
    pub fn new(store: Arc<dyn StateStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    fn config_key(&self) -> String {
        format!("{}.config", self.prefix)
    }

    async fn commissioned(&self, section: &str, uuid: &str) -> Result<bool, ConfigError> {
        let key = format!("{}.{section}.{uuid}.commissioned", self.prefix);
        let raw = self.store.get(&key).await?;
        Ok(raw
            .and_then(|raw| ValueType::Boolean.coerce(&raw))
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }
}

#[async_trait]
impl ConfigBackend for StoreBackend {
    async fn load(&self) -> Result<serde_json::Value, ConfigError> {
        match self.store.get(&self.config_key()).await? {
            // Stored as a JSON string by older versions.
            Some(serde_json::Value::String(text)) => Ok(serde_json::from_str(&text)?),
            Some(doc) => Ok(doc),
            None => Ok(serde_json::Value::Null),
        }
    }

    async fn save(&self, config: &MatterConfig) -> Result<(), ConfigError> {
        self.store.set(&self.config_key(), config.to_value()?).await?;
        debug!(key = %self.config_key(), "configuration written to state store");
        Ok(())
    }

    async fn commissioning(&self, config: &MatterConfig) -> Result<Commissioning, ConfigError> {
        let mut commissioning = Commissioning::default();
        for bridge in &config.bridges {
            let flag = self.commissioned("bridges", &bridge.uuid).await?;
            commissioning
                .bridges
                .insert(bridge.uuid.clone(), CommissioningStatus::commissioned(flag));
        }
        for device in &config.devices {
            let flag = self.commissioned("devices", &device.uuid).await?;
            commissioning
                .devices
                .insert(device.uuid.clone(), CommissioningStatus::commissioned(flag));
        }
        Ok(commissioning)
    }
}

// ── TOML file ───────────────────────────────────────────────────────

/// Configuration kept in a TOML file, with commissioning status in a JSON
/// file next to it.
pub struct FileBackend {
    path: PathBuf,
    commissioning_path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let commissioning_path = path.with_extension("commissioning.json");
        Self {
            path,
            commissioning_path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn commissioning_path(&self) -> &Path {
        &self.commissioning_path
    }
}

#[async_trait]
impl ConfigBackend for FileBackend {
    async fn load(&self) -> Result<serde_json::Value, ConfigError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(serde_json::Value::Null);
            }
            Err(e) => return Err(e.into()),
        };
        Ok(toml::from_str(&text)?)
    }

    async fn save(&self, config: &MatterConfig) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(config)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write next to the target and rename over it.
        let tmp = self.path.with_extension("toml.tmp");
        tokio::fs::write(&tmp, text).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), "configuration written");
        Ok(())
    }

    async fn commissioning(&self, config: &MatterConfig) -> Result<Commissioning, ConfigError> {
        let stored: Commissioning = match tokio::fs::read_to_string(&self.commissioning_path).await
        {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Commissioning::default(),
            Err(e) => return Err(e.into()),
        };

        // Only entities that are still configured.
        let mut commissioning = Commissioning::default();
        for bridge in &config.bridges {
            let status = stored.bridges.get(&bridge.uuid).cloned().unwrap_or_default();
            commissioning.bridges.insert(bridge.uuid.clone(), status);
        }
        for device in &config.devices {
            let status = stored.devices.get(&device.uuid).cloned().unwrap_or_default();
            commissioning.devices.insert(device.uuid.clone(), status);
        }
        Ok(commissioning)
    }
}
