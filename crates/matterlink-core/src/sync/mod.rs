// ── Protocol synchronization ──
//
// Projects device properties onto Matter endpoint attributes. The
// endpoint itself belongs to the protocol engine and is only seen
// through the `Endpoint` trait.

mod handler;
mod projection;
mod shape;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use handler::{SyncHandler, SyncStatus};
pub use projection::{Maintenance, Projection, Reachability};
pub use shape::{BridgedNode, EndpointShape, RootNode};

/// Sparse cluster -> attribute -> value tree written to an endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AttributePatch(serde_json::Map<String, serde_json::Value>);

impl AttributePatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or overwrite) one attribute.
    pub fn with(
        mut self,
        cluster: &str,
        attribute: &str,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        let entry = self
            .0
            .entry(cluster)
            .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
        if let serde_json::Value::Object(attributes) = entry {
            attributes.insert(attribute.to_owned(), value.into());
        }
        self
    }

    pub fn get(&self, cluster: &str, attribute: &str) -> Option<&serde_json::Value> {
        self.0.get(cluster)?.get(attribute)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> serde_json::Map<String, serde_json::Value> {
        self.0
    }
}

impl std::fmt::Display for AttributePatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", serde_json::Value::Object(self.0.clone()))
    }
}

/// Failure reported by the protocol engine when applying a patch.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct EndpointError(pub String);

/// A Matter endpoint that accepts attribute patches.
#[async_trait]
pub trait Endpoint: Send + Sync {
    async fn set(&self, patch: AttributePatch) -> Result<(), EndpointError>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn patch_nests_attributes_by_cluster() {
        let patch = AttributePatch::new()
            .with("powerSource", "batChargeLevel", 2)
            .with("powerSource", "status", 1)
            .with("basicInformation", "reachable", true);

        assert_eq!(
            serde_json::to_value(&patch).unwrap_or_default(),
            json!({
                "powerSource": { "batChargeLevel": 2, "status": 1 },
                "basicInformation": { "reachable": true }
            })
        );
        assert_eq!(patch.get("basicInformation", "reachable"), Some(&json!(true)));
        assert_eq!(patch.get("basicInformation", "missing"), None);
    }
}
