#![allow(clippy::unwrap_used)]
// Integration tests for `ConfigTracker` over the file and store backends.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use matterlink_config::{
    BridgeConfig, ConfigBackend, ConfigError, ConfigTracker, DeviceConfig, EntityKind, FileBackend, MatterConfig,
    StoreBackend,
};
use matterlink_core::MemoryStore;

// ── Helpers ─────────────────────────────────────────────────────────

fn plug(uuid: &str) -> DeviceConfig {
    DeviceConfig {
        uuid: uuid.into(),
        name: "Plug".into(),
        oid: "hm-rpc.0.plug".into(),
        device_type: "socket".into(),
        enabled: true,
        auto: false,
        vendor_id: Some("0xFFF1".into()),
        product_id: Some("0x8000".into()),
        extra: serde_json::Map::new(),
    }
}

fn bridge(uuid: &str, devices: Vec<DeviceConfig>) -> BridgeConfig {
    BridgeConfig {
        uuid: uuid.into(),
        name: "Living room".into(),
        enabled: true,
        vendor_id: None,
        product_id: None,
        devices,
        extra: serde_json::Map::new(),
    }
}

// ── File backend ────────────────────────────────────────────────────

#[tokio::test]
async fn test_change_detection_across_save_cycles() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(FileBackend::new(dir.path().join("matter.toml")));
    let tracker = ConfigTracker::new(backend);

    let mut config = tracker.load_config().await.unwrap();
    assert_eq!(config, MatterConfig::default());
    assert!(!tracker.is_changed(&config));

    config.devices.push(plug("d1"));
    assert!(tracker.is_changed(&config));

    tracker.save_config(&config).await.unwrap();
    assert!(!tracker.is_changed(&config));

    config.devices[0].enabled = false;
    assert!(tracker.is_changed(&config));

    tracker.save_config(&config).await.unwrap();
    assert!(!tracker.is_changed(&config));

    // Bridged devices count too.
    config.bridges.push(bridge("b1", vec![plug("d2")]));
    tracker.save_config(&config).await.unwrap();
    config.bridges[0].devices[0].name = "Heater".into();
    assert!(tracker.is_changed(&config));
    tracker.save_config(&config).await.unwrap();

    // Removals are changes.
    let mut without_device = config.clone();
    without_device.devices.clear();
    assert!(tracker.is_changed(&without_device));

    let mut without_bridged = config.clone();
    without_bridged.bridges[0].devices.clear();
    assert!(tracker.is_changed(&without_bridged));

    let mut without_bridge = config.clone();
    without_bridge.bridges.clear();
    assert!(tracker.is_changed(&without_bridge));
    assert!(!tracker.is_changed(&config));

    // A fresh tracker sees exactly what was saved.
    let backend = Arc::new(FileBackend::new(dir.path().join("matter.toml")));
    let reloaded = ConfigTracker::new(backend).load_config().await.unwrap();
    assert_eq!(reloaded, config);
}

#[tokio::test]
async fn test_unreadable_file_is_a_load_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("matter.toml");
    std::fs::write(&path, "devices = [ this is not toml").unwrap();
    let tracker = ConfigTracker::new(Arc::new(FileBackend::new(path)));

    let err = tracker.load_config().await.unwrap_err();
    assert!(matches!(err, ConfigError::LoadFailed { .. }));
}

#[tokio::test]
async fn test_config_watchers_see_saves() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = ConfigTracker::new(Arc::new(FileBackend::new(dir.path().join("m.toml"))));
    let mut rx = tracker.watch_config();

    let mut config = MatterConfig::default();
    config.controller.enabled = true;
    tracker.save_config(&config).await.unwrap();

    assert!(rx.has_changed().unwrap());
    let seen = rx.borrow_and_update().clone().unwrap();
    assert!(seen.controller.enabled);
}

// ── Store backend ───────────────────────────────────────────────────

#[tokio::test]
async fn test_store_backend_normalizes_and_reads_commissioning() {
    let store = Arc::new(MemoryStore::new());
    store.insert(
        "matter.0.config",
        json!({
            "controller": null,
            "bridges": { "list": [{ "uuid": "b1", "name": "Bridge", "list": [] }] },
            "devices": { "list": [{ "uuid": "d1", "oid": "hm-rpc.0.plug", "type": "socket" }] }
        }),
    );
    store.insert("matter.0.bridges.b1.commissioned", json!(true));

    let backend = Arc::new(StoreBackend::new(store.clone(), "matter.0"));
    let tracker = ConfigTracker::new(backend);

    let config = tracker.load_config().await.unwrap();
    assert!(!config.controller.enabled);
    assert_eq!(config.bridges[0].uuid, "b1");
    assert_eq!(config.devices[0].device_type, "socket");

    let commissioning = tracker.get_commissioning();
    assert!(commissioning.is_commissioned(EntityKind::Bridge, "b1"));
    assert!(!commissioning.is_commissioned(EntityKind::Device, "d1"));

    tracker.save_config(&config).await.unwrap();
    let written = store.value("matter.0.config").unwrap();
    assert_eq!(written["devices"][0]["uuid"], json!("d1"));
    assert_eq!(written["controller"], json!({ "enabled": false }));
}

#[tokio::test]
async fn test_store_rejection_is_a_save_failure() {
    let store = Arc::new(MemoryStore::new());
    store.make_read_only("matter.0.config");
    let backend: Arc<dyn ConfigBackend> = Arc::new(StoreBackend::new(store, "matter.0"));
    let tracker = ConfigTracker::new(backend);

    let err = tracker.save_config(&MatterConfig::default()).await.unwrap_err();
    assert!(matches!(err, ConfigError::SaveFailed { .. }));
}
