//! `simulate`: drive a scripted scenario through real devices, a sync
//! session and recording endpoints, then print what reached each side.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tabled::Tabled;
use tracing::info;

use matterlink_config::Settings;
use matterlink_core::{
    AttributePatch, BackendUpdate, BridgedNode, CoreError, DetectedDevice, Device, DeviceEvent,
    Endpoint, EndpointError, EndpointShape, MemoryStore, PropertyType, RootNode, StateMeta,
    StatusSource, SubscribeAck, SyncSession, Value, create_device,
};

use crate::cli::{GlobalOpts, SimulateArgs};
use crate::error::CliError;
use crate::output;

// ── Trace ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
struct TraceEntry {
    seq: usize,
    /// `event` for device changes, `patch` for endpoint writes.
    source: &'static str,
    device: String,
    detail: String,
}

#[derive(Tabled)]
struct TraceRow {
    #[tabled(rename = "#")]
    seq: usize,
    #[tabled(rename = "SOURCE")]
    source: &'static str,
    #[tabled(rename = "DEVICE")]
    device: String,
    #[tabled(rename = "DETAIL")]
    detail: String,
}

/// Shared, ordered log of everything the scenario produced.
#[derive(Clone, Default)]
struct Trace(Arc<Mutex<Vec<TraceEntry>>>);

impl Trace {
    fn push(&self, source: &'static str, device: &str, detail: String) {
        let mut entries = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        let seq = entries.len() + 1;
        entries.push(TraceEntry {
            seq,
            source,
            device: device.to_owned(),
            detail,
        });
    }

    fn entries(&self) -> Vec<TraceEntry> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

// ── Local collaborators ─────────────────────────────────────────────

/// Endpoint that accepts every patch and records it.
struct RecordingEndpoint {
    device: String,
    trace: Trace,
}

#[async_trait]
impl Endpoint for RecordingEndpoint {
    async fn set(&self, patch: AttributePatch) -> Result<(), EndpointError> {
        info!(device = %self.device, %patch, "endpoint patch");
        self.trace.push("patch", &self.device, patch.to_string());
        Ok(())
    }
}

/// Status feed that accepts every subscription.
struct LocalFeed;

#[async_trait]
impl StatusSource for LocalFeed {
    async fn subscribe(&self, client: &str) -> Result<SubscribeAck, CoreError> {
        info!(%client, "status subscription accepted");
        Ok(SubscribeAck::Accepted)
    }
}

// ── Scenario ────────────────────────────────────────────────────────

const LAMP: &str = "sim.0.lamp";
const SPEAKERS: &str = "sim.0.speakers";

fn key(device: &str, state: &str) -> String {
    format!("{device}.{state}")
}

/// Declare the states a type detector would have found.
fn seed_store(store: &MemoryStore) {
    for state in ["level", "set"] {
        store.declare(key(LAMP, state), StateMeta::bounded(0.0, 100.0));
        store.update(&key(LAMP, state), json!(0));
    }
    for state in ["on", "on_set", "unreach", "lowbat"] {
        store.insert(key(LAMP, state), json!(false));
    }

    store.declare(key(SPEAKERS, "level"), StateMeta::bounded(0.0, 100.0));
    store.update(&key(SPEAKERS, "level"), json!(20));
    for state in ["mute", "unreach"] {
        store.insert(key(SPEAKERS, state), json!(false));
    }
}

fn detected() -> [DetectedDevice; 2] {
    [
        DetectedDevice::new(LAMP, "dimmer")
            .with_name("Lamp")
            .with_state("ACTUAL", key(LAMP, "level"))
            .with_state("SET", key(LAMP, "set"))
            .with_state("ON_ACTUAL", key(LAMP, "on"))
            .with_state("ON_SET", key(LAMP, "on_set"))
            .with_state("UNREACH", key(LAMP, "unreach"))
            .with_state("LOWBAT", key(LAMP, "lowbat")),
        DetectedDevice::new(SPEAKERS, "volumeGroup")
            .with_name("Speakers")
            .with_state("SET", key(SPEAKERS, "level"))
            .with_state("MUTE", key(SPEAKERS, "mute"))
            .with_state("UNREACH", key(SPEAKERS, "unreach")),
    ]
}

fn describe(value: Option<&Value>) -> String {
    value.map_or_else(|| "null".into(), ToString::to_string)
}

pub async fn handle(
    args: SimulateArgs,
    settings: &Settings,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let settle = Duration::from_millis(args.settle_ms);
    let trace = Trace::default();

    let store = Arc::new(MemoryStore::echoing());
    seed_store(&store);

    let [lamp, speakers] = detected();
    let lamp = open(&lamp, &store, &trace).await?;
    let speakers = open(&speakers, &store, &trace).await?;

    let session = SyncSession::start(settings.session_config(), Arc::new(LocalFeed));
    session.on_alive(true).await?;
    attach(&session, &lamp, RootNode, &trace).await?;
    attach(&session, &speakers, BridgedNode, &trace).await?;
    tokio::time::sleep(settle).await;

    // Commands go through the device; the echoing store acknowledges them.
    lamp.generic().set(PropertyType::Dimmer, Value::Number(75.0)).await?;
    speakers.generic().set(PropertyType::Mute, Value::Bool(true)).await?;
    tokio::time::sleep(settle).await;

    // Device-side reports.
    let script = [
        (key(LAMP, "unreach"), json!(true)),
        (key(LAMP, "lowbat"), json!(true)),
        (key(LAMP, "unreach"), json!(false)),
        (key(SPEAKERS, "unreach"), json!("true")),
        (key(SPEAKERS, "level"), json!(35)),
    ];
    for (state, value) in script {
        store.update(&state, value);
        tokio::time::sleep(settle).await;
    }

    session.handle_update(BackendUpdate::from_json(json!({
        "command": "bridgeStates",
        "states": { "matter.0.bridges.lamp": { "status": "running" } }
    })));
    let bridge_states = session.bridge_states().borrow().len();

    session.shutdown();
    lamp.generic().destroy();
    speakers.generic().destroy();

    let entries = trace.entries();
    info!(entries = entries.len(), bridge_states, "simulation finished");
    let out = output::render_list(
        &global.output,
        &entries,
        |e| TraceRow {
            seq: e.seq,
            source: e.source,
            device: e.device.clone(),
            detail: e.detail.clone(),
        },
        |e| format!("{} {} {}", e.source, e.device, e.detail),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Create the device and log its change events.
async fn open(
    detected: &DetectedDevice,
    store: &Arc<MemoryStore>,
    trace: &Trace,
) -> Result<Device, CliError> {
    let device = create_device(detected, store.clone()).await?;
    let generic = device.generic();
    let (name, log) = (generic.name().to_owned(), trace.clone());
    generic.on_change(Arc::new(move |event: &DeviceEvent| {
        log.push(
            "event",
            &name,
            format!("{} = {}", event.property, describe(event.value.as_ref())),
        );
    }))?;
    Ok(device)
}

async fn attach<S: EndpointShape>(
    session: &SyncSession,
    device: &Device,
    shape: S,
    trace: &Trace,
) -> Result<(), CliError> {
    let generic = device.generic();
    let endpoint = Arc::new(RecordingEndpoint {
        device: generic.name().to_owned(),
        trace: trace.clone(),
    });
    let handlers = session.attach(generic, endpoint, shape).await?;
    info!(device = %generic.id(), kind = device.kind_name(), handlers, "simulated device attached");
    Ok(())
}
