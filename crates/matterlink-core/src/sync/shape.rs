// ── Endpoint shapes ──
//
// A standalone device exposes reachability on its root node's basic
// information cluster; a device behind a bridge exposes it on the
// bridged-device variant of that cluster.

use super::AttributePatch;

/// Where a node type keeps its node-level attributes.
pub trait EndpointShape: Send + Sync + 'static {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    fn reachable(&self, reachable: bool) -> AttributePatch;
}

/// Standalone device: root endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct RootNode;

impl EndpointShape for RootNode {
    fn name(&self) -> &'static str {
        "root"
    }

    fn reachable(&self, reachable: bool) -> AttributePatch {
        AttributePatch::new().with("basicInformation", "reachable", reachable)
    }
}

/// Child endpoint of an aggregator (bridge).
#[derive(Debug, Clone, Copy, Default)]
pub struct BridgedNode;

impl EndpointShape for BridgedNode {
    fn name(&self) -> &'static str {
        "bridged"
    }

    fn reachable(&self, reachable: bool) -> AttributePatch {
        AttributePatch::new().with("bridgedDeviceBasicInformation", "reachable", reachable)
    }
}
