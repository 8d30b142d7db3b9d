// ── Platform state store seam ──
//
// The home-automation platform's key-value store, consumed as an opaque
// collaborator. Listeners are plain synchronous callbacks so that a
// device can deregister them synchronously on teardown.

mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::StateMeta;

pub use memory::MemoryStore;

/// Callback invoked with `(key, raw_value)` whenever a subscribed key changes.
/// A deleted state is reported as `null`.
pub type StateListener = Arc<dyn Fn(&str, &serde_json::Value) + Send + Sync>;

/// Handle returned by [`StateStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Failures reported by a state store implementation.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("write to {key} rejected: {reason}")]
    Rejected { key: String, reason: String },

    #[error("state store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait StateStore: Send + Sync {
    /// Metadata for a key, or `None` if no such state exists.
    async fn describe(&self, key: &str) -> Result<Option<StateMeta>, StoreError>;

    /// Current raw value of a key, or `None` if it has never been set.
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError>;

    /// Write a raw value. Success means the store accepted the write, not
    /// that the physical device applied it.
    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError>;

    fn subscribe(&self, key: &str, listener: StateListener) -> SubscriptionId;

    /// Remove a subscription. Updates published after this returns are not
    /// delivered to the listener.
    fn unsubscribe(&self, id: SubscriptionId);
}
