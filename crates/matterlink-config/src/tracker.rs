// ── Configuration tracker ──
//
// Holds the last configuration loaded from or saved to the backend, so
// editors can ask whether a candidate differs from what is persisted,
// and the last known commissioning status per bridge and device.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwapOption;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backend::ConfigBackend;
use crate::error::ConfigError;
use crate::model::{Commissioning, CommissioningUpdate, MatterConfig};

/// Cheaply cloneable handle; clones share the same snapshot.
#[derive(Clone)]
pub struct ConfigTracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    backend: Arc<dyn ConfigBackend>,
    snapshot: ArcSwapOption<MatterConfig>,
    config: watch::Sender<Option<Arc<MatterConfig>>>,
    commissioning: watch::Sender<Arc<Commissioning>>,
    destroyed: AtomicBool,
}

impl ConfigTracker {
    pub fn new(backend: Arc<dyn ConfigBackend>) -> Self {
        let (config, _) = watch::channel(None);
        let (commissioning, _) = watch::channel(Arc::new(Commissioning::default()));
        Self {
            inner: Arc::new(TrackerInner {
                backend,
                snapshot: ArcSwapOption::empty(),
                config,
                commissioning,
                destroyed: AtomicBool::new(false),
            }),
        }
    }

    /// Fetch and normalize the persisted configuration, remember it as the
    /// snapshot and refresh commissioning status.
    ///
    /// A document that fails validation is still returned; the problem is
    /// logged and surfaces again on save.
    pub async fn load_config(&self) -> Result<MatterConfig, ConfigError> {
        self.ensure_alive()?;

        let raw = self.inner.backend.load().await.map_err(load_failed)?;
        let config = MatterConfig::from_value(raw).map_err(load_failed)?;
        if let Err(e) = config.validate() {
            warn!(error = %e, "loaded configuration is invalid");
        }
        if self.is_destroyed() {
            return Err(ConfigError::Destroyed);
        }

        self.remember(&config);
        self.refresh_commissioning(&config).await;

        info!(
            bridges = config.bridges.len(),
            devices = config.devices.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Whether `candidate` differs from the last loaded or saved snapshot.
    /// Always `true` before anything was loaded.
    pub fn is_changed(&self, candidate: &MatterConfig) -> bool {
        self.inner
            .snapshot
            .load()
            .as_deref()
            .is_none_or(|snapshot| snapshot != candidate)
    }

    /// Validate and persist `config`; on success it becomes the snapshot.
    ///
    /// If the tracker is destroyed while the write is in flight the data is
    /// still persisted, but the snapshot is left alone and nothing is
    /// published.
    pub async fn save_config(&self, config: &MatterConfig) -> Result<(), ConfigError> {
        self.ensure_alive()?;
        config.validate()?;

        self.inner
            .backend
            .save(config)
            .await
            .map_err(|e| ConfigError::SaveFailed {
                reason: e.to_string(),
            })?;
        if self.is_destroyed() {
            return Err(ConfigError::Destroyed);
        }

        self.remember(config);
        info!("configuration saved");
        Ok(())
    }

    /// Last known commissioning status.
    pub fn get_commissioning(&self) -> Arc<Commissioning> {
        Arc::clone(&self.inner.commissioning.borrow())
    }

    /// Record a commissioning change reported by the protocol backend.
    pub fn notify_commissioning(&self, update: CommissioningUpdate) -> Result<(), ConfigError> {
        self.ensure_alive()?;
        debug!(uuid = %update.uuid, kind = ?update.kind, commissioned = update.status.commissioned, "commissioning changed");
        self.inner.commissioning.send_if_modified(|current| {
            let mut next = (**current).clone();
            next.apply(update);
            if next == **current {
                return false;
            }
            *current = Arc::new(next);
            true
        });
        Ok(())
    }

    pub fn watch_commissioning(&self) -> watch::Receiver<Arc<Commissioning>> {
        self.inner.commissioning.subscribe()
    }

    /// Snapshot changes: every successful load or save.
    pub fn watch_config(&self) -> watch::Receiver<Option<Arc<MatterConfig>>> {
        self.inner.config.subscribe()
    }

    /// Stop publishing updates. Later calls fail with
    /// [`ConfigError::Destroyed`]; a load in flight is discarded.
    pub fn destroy(&self) {
        if !self.inner.destroyed.swap(true, Ordering::AcqRel) {
            debug!("configuration tracker destroyed");
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::Acquire)
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn ensure_alive(&self) -> Result<(), ConfigError> {
        if self.is_destroyed() {
            Err(ConfigError::Destroyed)
        } else {
            Ok(())
        }
    }

    fn remember(&self, config: &MatterConfig) {
        let snapshot = Arc::new(config.clone());
        self.inner.snapshot.store(Some(Arc::clone(&snapshot)));
        self.inner.config.send_replace(Some(snapshot));
    }

    async fn refresh_commissioning(&self, config: &MatterConfig) {
        match self.inner.backend.commissioning(config).await {
            Ok(commissioning) if !self.is_destroyed() => {
                self.inner.commissioning.send_replace(Arc::new(commissioning));
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "failed to read commissioning status"),
        }
    }
}

fn load_failed(e: ConfigError) -> ConfigError {
    ConfigError::LoadFailed {
        reason: e.to_string(),
    }
}
