// ── In-process state store ──
//
// DashMap-backed implementation of `StateStore`. Used by tests and the
// simulation command; behaves like the platform store: writes through
// `set` are commands, `update` is the device (or another adapter)
// reporting a new value.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use tracing::trace;

use super::{StateListener, StateStore, StoreError, SubscriptionId};
use crate::model::StateMeta;

#[derive(Debug, Clone, Default)]
struct StateEntry {
    meta: StateMeta,
    value: Option<serde_json::Value>,
}

/// A lock-free, in-memory state store with synchronous change dispatch.
pub struct MemoryStore {
    /// Declared states: key -> metadata + last value.
    states: DashMap<String, StateEntry>,

    /// Subscription ids per key, in subscription order.
    by_key: DashMap<String, Vec<SubscriptionId>>,

    /// Subscription id -> (key, listener).
    listeners: DashMap<SubscriptionId, (String, StateListener)>,

    /// Keys whose writes are rejected.
    read_only: DashSet<String>,

    /// Every accepted `set`, in order.
    writes: Mutex<Vec<(String, serde_json::Value)>>,

    /// Whether accepted writes are reported back to listeners.
    echo: bool,

    next_id: AtomicU64,
}

impl MemoryStore {
    /// A store that records writes without reporting them back.
    pub fn new() -> Self {
        Self {
            states: DashMap::new(),
            by_key: DashMap::new(),
            listeners: DashMap::new(),
            read_only: DashSet::new(),
            writes: Mutex::new(Vec::new()),
            echo: false,
            next_id: AtomicU64::new(1),
        }
    }

    /// A store that acknowledges every accepted write as an update, like a
    /// device that applies commands immediately.
    pub fn echoing() -> Self {
        Self {
            echo: true,
            ..Self::new()
        }
    }

    /// Declare a state with metadata and no value.
    pub fn declare(&self, key: impl Into<String>, meta: StateMeta) {
        self.states.insert(
            key.into(),
            StateEntry {
                meta,
                value: None,
            },
        );
    }

    /// Declare a state with default metadata and an initial value.
    pub fn insert(&self, key: impl Into<String>, value: serde_json::Value) {
        self.states.insert(
            key.into(),
            StateEntry {
                meta: StateMeta::default(),
                value: Some(value),
            },
        );
    }

    /// Reject every future write to `key`.
    pub fn make_read_only(&self, key: impl Into<String>) {
        self.read_only.insert(key.into());
    }

    /// Record a new value for `key` and notify its listeners in order.
    ///
    /// Undeclared keys are declared on the fly.
    pub fn update(&self, key: &str, value: serde_json::Value) {
        self.states
            .entry(key.to_owned())
            .or_default()
            .value = Some(value.clone());
        self.dispatch(key, &value);
    }

    /// Remove a state and report `null` to its listeners.
    pub fn remove(&self, key: &str) {
        if self.states.remove(key).is_some() {
            self.dispatch(key, &serde_json::Value::Null);
        }
    }

    /// Current raw value, without going through the async trait.
    pub fn value(&self, key: &str) -> Option<serde_json::Value> {
        self.states.get(key).and_then(|e| e.value.clone())
    }

    /// All accepted writes so far.
    pub fn writes(&self) -> Vec<(String, serde_json::Value)> {
        self.writes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    pub fn subscriber_count(&self, key: &str) -> usize {
        self.by_key.get(key).map_or(0, |ids| ids.len())
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Call every listener for `key`. Listeners are cloned out first so no
    /// map guard is held while user code runs.
    fn dispatch(&self, key: &str, value: &serde_json::Value) {
        let ids = self
            .by_key
            .get(key)
            .map(|ids| ids.value().clone())
            .unwrap_or_default();

        for id in ids {
            let listener = self.listeners.get(&id).map(|l| l.value().1.clone());
            if let Some(listener) = listener {
                trace!(key, ?id, "dispatching state change");
                listener(key, value);
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn describe(&self, key: &str) -> Result<Option<StateMeta>, StoreError> {
        Ok(self.states.get(key).map(|e| e.meta.clone()))
    }

    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        if self.read_only.contains(key) {
            return Err(StoreError::Rejected {
                key: key.to_owned(),
                reason: "state is read-only".into(),
            });
        }

        self.writes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((key.to_owned(), value.clone()));

        if self.echo {
            self.update(key, value);
        } else {
            self.states.entry(key.to_owned()).or_default().value = Some(value);
        }
        Ok(())
    }

    fn subscribe(&self, key: &str, listener: StateListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.insert(id, (key.to_owned(), listener));
        self.by_key.entry(key.to_owned()).or_default().push(id);
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        if let Some((_, (key, _))) = self.listeners.remove(&id) {
            if let Some(mut ids) = self.by_key.get_mut(&key) {
                ids.retain(|other| *other != id);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    fn recorder() -> (StateListener, Arc<Mutex<Vec<serde_json::Value>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener: StateListener = Arc::new(move |_key, value| {
            sink.lock().unwrap().push(value.clone());
        });
        (listener, seen)
    }

    #[tokio::test]
    async fn describe_distinguishes_missing_states() {
        let store = MemoryStore::new();
        store.declare("a.level", StateMeta::bounded(0.0, 255.0));

        let meta = store.describe("a.level").await.unwrap().unwrap();
        assert_eq!(meta.max, Some(255.0));
        assert!(store.describe("a.missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_notifies_in_order() {
        let store = MemoryStore::new();
        let (listener, seen) = recorder();
        store.subscribe("a.on", listener);

        store.update("a.on", json!(true));
        store.update("a.on", json!(false));

        assert_eq!(*seen.lock().unwrap(), vec![json!(true), json!(false)]);
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let store = MemoryStore::new();
        let (listener, seen) = recorder();
        let id = store.subscribe("a.on", listener);

        store.unsubscribe(id);
        store.update("a.on", json!(true));

        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(store.subscriber_count("a.on"), 0);
    }

    #[tokio::test]
    async fn set_records_without_echo() {
        let store = MemoryStore::new();
        let (listener, seen) = recorder();
        store.subscribe("a.level", listener);

        store.set("a.level", json!(42)).await.unwrap();

        assert_eq!(store.writes(), vec![("a.level".to_owned(), json!(42))]);
        assert_eq!(store.value("a.level"), Some(json!(42)));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn echoing_store_reports_writes() {
        let store = MemoryStore::echoing();
        let (listener, seen) = recorder();
        store.subscribe("a.level", listener);

        store.set("a.level", json!(7)).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![json!(7)]);
    }

    #[tokio::test]
    async fn read_only_keys_reject_writes() {
        let store = MemoryStore::new();
        store.make_read_only("a.actual");

        let err = store.set("a.actual", json!(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected { .. }));
        assert!(store.writes().is_empty());
    }
}
