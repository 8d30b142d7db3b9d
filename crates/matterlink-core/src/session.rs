// ── Synchronization session ──
//
// Owns the sync handlers attached to devices and the keep-alive cycle
// against the backend status feed: while the backend is alive the
// session re-subscribes at a fixed interval, cancelling and
// rescheduling its own timer every time.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::device::GenericDevice;
use crate::error::CoreError;
use crate::sync::{Endpoint, EndpointShape, Maintenance, Reachability, SyncHandler, SyncStatus};

const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(60);
const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(5);

// ── Configuration ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Interval between status feed re-subscriptions.
    pub keepalive_interval: Duration,
    /// Delay before re-subscribing after the backend reported it stopped.
    pub restart_delay: Duration,
    /// Name the session subscribes under.
    pub client_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            keepalive_interval: DEFAULT_KEEPALIVE,
            restart_delay: DEFAULT_RESTART_DELAY,
            client_name: "gui".into(),
        }
    }
}

// ── Status feed ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeAck {
    Accepted,
    Rejected,
}

/// The backend's status feed.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn subscribe(&self, client: &str) -> Result<SubscribeAck, CoreError>;
}

/// A message received on the status feed.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendUpdate {
    /// Full bridge state map, keyed by dotted object id.
    BridgeStates(Vec<(String, serde_json::Value)>),
    /// State of a single bridge or device.
    Bridge {
        uuid: String,
        state: serde_json::Value,
    },
    /// The backend is shutting down.
    Stopped,
    Unknown(serde_json::Value),
}

impl BackendUpdate {
    pub fn from_json(raw: serde_json::Value) -> Self {
        let command = raw.get("command").and_then(serde_json::Value::as_str);

        if command == Some("bridgeStates") {
            let states = raw
                .get("states")
                .and_then(serde_json::Value::as_object)
                .map(|states| {
                    states
                        .iter()
                        .map(|(id, state)| (id.clone(), state.clone()))
                        .collect()
                })
                .unwrap_or_default();
            return Self::BridgeStates(states);
        }

        if let Some(uuid) = raw
            .get("uuid")
            .and_then(serde_json::Value::as_str)
            .filter(|uuid| !uuid.is_empty())
        {
            return Self::Bridge {
                uuid: uuid.to_owned(),
                state: raw.clone(),
            };
        }

        if command == Some("stopped") {
            Self::Stopped
        } else {
            Self::Unknown(raw)
        }
    }
}

pub type BridgeStates = Arc<BTreeMap<String, serde_json::Value>>;

// ── SyncSession ──────────────────────────────────────────────────────

/// Cheaply cloneable handle to a running session.
#[derive(Clone)]
pub struct SyncSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: SessionConfig,
    source: Arc<dyn StatusSource>,
    cancel: CancellationToken,
    /// Pending refresh timer; replaced on every reschedule.
    refresh_timer: Mutex<Option<CancellationToken>>,
    alive: watch::Sender<bool>,
    backend_running: watch::Sender<bool>,
    bridge_states: watch::Sender<BridgeStates>,
    handlers: Mutex<Vec<JoinHandle<()>>>,
}

impl SyncSession {
    pub fn start(config: SessionConfig, source: Arc<dyn StatusSource>) -> Self {
        let (alive, _) = watch::channel(false);
        let (backend_running, _) = watch::channel(false);
        let (bridge_states, _) = watch::channel(Arc::new(BTreeMap::new()));

        info!(
            client = %config.client_name,
            keepalive_secs = config.keepalive_interval.as_secs(),
            "sync session started"
        );
        Self {
            inner: Arc::new(SessionInner {
                config,
                source,
                cancel: CancellationToken::new(),
                refresh_timer: Mutex::new(None),
                alive,
                backend_running,
                bridge_states,
                handlers: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    // ── Keep-alive ───────────────────────────────────────────────────

    /// Reschedule the keep-alive timer and re-subscribe to the status feed.
    pub async fn refresh_subscription(&self) -> Result<(), CoreError> {
        self.ensure_open()?;
        self.schedule_refresh(self.inner.config.keepalive_interval);
        self.resubscribe().await;
        Ok(())
    }

    /// Backend liveness changed. Coming alive starts the keep-alive cycle;
    /// going down stops it.
    pub async fn on_alive(&self, alive: bool) -> Result<(), CoreError> {
        self.ensure_open()?;
        let was_alive = self.inner.alive.send_replace(alive);
        if alive && !was_alive {
            info!("backend alive");
            self.refresh_subscription().await?;
        } else if !alive && was_alive {
            info!("backend down, keep-alive stopped");
            self.inner.cancel_refresh();
        }
        Ok(())
    }

    // ── Status feed ──────────────────────────────────────────────────

    pub fn handle_update(&self, update: BackendUpdate) {
        if self.inner.cancel.is_cancelled() {
            return;
        }
        match update {
            BackendUpdate::BridgeStates(states) => {
                let mut reduced = BTreeMap::new();
                for (id, state) in states {
                    let uuid = id.rsplit('.').next().unwrap_or(&id).to_owned();
                    if reduced.contains_key(&uuid) {
                        warn!(%id, %uuid, "duplicate bridge uuid in state map, keeping first");
                        continue;
                    }
                    reduced.insert(uuid, state);
                }
                debug!(count = reduced.len(), "bridge states replaced");
                self.inner.bridge_states.send_replace(Arc::new(reduced));
            }
            BackendUpdate::Bridge { uuid, state } => {
                debug!(%uuid, "bridge state updated");
                self.inner.bridge_states.send_modify(|states| {
                    Arc::make_mut(states).insert(uuid, state);
                });
            }
            BackendUpdate::Stopped => {
                info!(
                    delay_secs = self.inner.config.restart_delay.as_secs(),
                    "backend stopped, re-subscribing later"
                );
                self.schedule_refresh(self.inner.config.restart_delay);
            }
            BackendUpdate::Unknown(raw) => {
                debug!(%raw, "unknown backend update");
            }
        }
    }

    // ── Handlers ─────────────────────────────────────────────────────

    /// Attach reachability and maintenance handlers for `device`.
    ///
    /// Returns the number of handlers that applied to the device.
    pub async fn attach<S: EndpointShape>(
        &self,
        device: &GenericDevice,
        endpoint: Arc<dyn Endpoint>,
        shape: S,
    ) -> Result<usize, CoreError> {
        self.ensure_open()?;
        let shape_name = shape.name();

        let reachability = SyncHandler::new(Reachability::new(shape))
            .attach(device, Arc::clone(&endpoint))
            .await?;
        let maintenance = match SyncHandler::new(Maintenance).attach(device, endpoint).await {
            Ok(status) => status,
            Err(e) => {
                if let Some(task) = reachability.into_task() {
                    task.abort();
                }
                return Err(e);
            }
        };

        let tasks: Vec<JoinHandle<()>> = [reachability, maintenance]
            .into_iter()
            .filter_map(SyncStatus::into_task)
            .collect();
        let attached = tasks.len();

        let mut handlers = self
            .inner
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        handlers.retain(|task| !task.is_finished());
        handlers.extend(tasks);

        info!(device = %device.id(), shape = shape_name, handlers = attached, "device attached");
        Ok(attached)
    }

    /// Stop the keep-alive cycle and every handler. Status updates received
    /// afterwards are ignored.
    pub fn shutdown(&self) {
        if self.inner.cancel.is_cancelled() {
            return;
        }
        self.inner.cancel.cancel();
        self.inner.cancel_refresh();
        for task in self
            .inner
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
        {
            task.abort();
        }
        info!("sync session shut down");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    // ── Observers ────────────────────────────────────────────────────

    pub fn alive(&self) -> watch::Receiver<bool> {
        self.inner.alive.subscribe()
    }

    pub fn backend_running(&self) -> watch::Receiver<bool> {
        self.inner.backend_running.subscribe()
    }

    pub fn bridge_states(&self) -> watch::Receiver<BridgeStates> {
        self.inner.bridge_states.subscribe()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn ensure_open(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            Err(CoreError::SessionClosed)
        } else {
            Ok(())
        }
    }

    /// Replace the pending timer with one that fires after `delay`.
    fn schedule_refresh(&self, delay: Duration) {
        let timer = self.inner.cancel.child_token();
        let previous = self
            .inner
            .refresh_timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(timer.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }

        let session = Arc::downgrade(&self.inner);
        tokio::spawn(refresh_timer_task(session, timer, delay));
    }

    async fn resubscribe(&self) {
        let result = self
            .inner
            .source
            .subscribe(&self.inner.config.client_name)
            .await;
        if self.inner.cancel.is_cancelled() {
            return;
        }

        let running = match result {
            Ok(SubscribeAck::Accepted) => {
                debug!("status subscription accepted");
                true
            }
            Ok(SubscribeAck::Rejected) => {
                warn!("status subscription not accepted");
                false
            }
            Err(e) => {
                warn!(error = %e, "status subscription failed");
                false
            }
        };
        self.inner.backend_running.send_if_modified(|current| {
            let changed = *current != running;
            *current = running;
            changed
        });
    }
}

impl SessionInner {
    fn cancel_refresh(&self) {
        if let Some(timer) = self
            .refresh_timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            timer.cancel();
        }
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn refresh_timer_task(session: Weak<SessionInner>, timer: CancellationToken, delay: Duration) {
    tokio::select! {
        biased;
        () = timer.cancelled() => {}
        () = tokio::time::sleep(delay) => {
            let Some(inner) = session.upgrade() else {
                return;
            };
            let session = SyncSession { inner };
            if let Err(e) = session.refresh_subscription().await {
                debug!(error = %e, "keep-alive refresh skipped");
            }
        }
    }
}
