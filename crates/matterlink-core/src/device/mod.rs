// ── Generic device ──
//
// A device is a named aggregate of state bindings. Kinds declare which
// bindings they want as ordered descriptor groups; `DeviceBuilder`
// resolves every group against the state store before the device is
// handed out, then wires one store subscription per binding into the
// device's change stream.

pub mod catalog;
pub mod descriptors;
pub mod kinds;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use futures_util::future::join_all;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::binding::{BindingDescriptor, BindingPair, Slot, StateBinding};
use crate::error::CoreError;
use crate::model::{DetectedDevice, PropertyType, Value};
use crate::store::{StateListener, StateStore, SubscriptionId};

use self::kinds::DeviceKind;

const EVENT_CHANNEL_SIZE: usize = 64;

// ── Events ───────────────────────────────────────────────────────────

/// A property of the device changed in the store.
///
/// `value` is `None` when the new raw value could not be interpreted or the
/// state was deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceEvent {
    pub property: PropertyType,
    pub value: Option<Value>,
}

/// Synchronous change callback, invoked inside the store notification.
pub type ChangeListener = Arc<dyn Fn(&DeviceEvent) + Send + Sync>;

// ── GenericDevice ────────────────────────────────────────────────────

/// Handle to a resolved device. Cheaply cloneable; all clones share the
/// same bindings and change stream.
#[derive(Clone)]
pub struct GenericDevice {
    inner: Arc<DeviceInner>,
}

struct DeviceInner {
    id: String,
    name: String,
    kind: &'static str,
    properties: BTreeMap<PropertyType, BindingPair>,
    store: Arc<dyn StateStore>,
    subscriptions: Mutex<Vec<SubscriptionId>>,
    listeners: RwLock<Vec<ChangeListener>>,
    events: broadcast::Sender<DeviceEvent>,
    destroyed: AtomicBool,
    cancel: CancellationToken,
}

impl std::fmt::Debug for GenericDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericDevice")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("properties", &self.inner.properties.keys().collect::<Vec<_>>())
            .field("destroyed", &self.is_destroyed())
            .finish_non_exhaustive()
    }
}

impl GenericDevice {
    /// Build a device of kind `K` from a detected device.
    pub async fn open<K: DeviceKind>(detected: &DetectedDevice, store: Arc<dyn StateStore>) -> K {
        let builder = K::steps()
            .iter()
            .fold(DeviceBuilder::new(detected, store).kind(K::NAME), |b, group| {
                b.step(*group)
            });
        K::from_device(builder.build().await)
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Kind name, e.g. `"dimmer"`.
    pub fn kind(&self) -> &'static str {
        self.inner.kind
    }

    // ── Property access ──────────────────────────────────────────────

    /// Whether the property resolved to at least one binding.
    pub fn has(&self, property: PropertyType) -> Result<bool, CoreError> {
        self.inner.ensure_alive()?;
        Ok(self
            .inner
            .properties
            .get(&property)
            .is_some_and(|pair| pair.read().is_some()))
    }

    /// Properties with at least one resolved binding, in taxonomy order.
    pub fn property_names(&self) -> Result<Vec<PropertyType>, CoreError> {
        self.inner.ensure_alive()?;
        Ok(self.inner.bound_properties())
    }

    /// Current value of a property, preferring its actual binding.
    ///
    /// `Ok(None)` means the property is bound but no value is known yet.
    pub fn value(&self, property: PropertyType) -> Result<Option<Value>, CoreError> {
        self.inner.ensure_alive()?;
        let binding = self
            .inner
            .properties
            .get(&property)
            .and_then(BindingPair::read)
            .ok_or_else(|| self.inner.not_bound(property))?;
        Ok(binding.value())
    }

    pub fn bool(&self, property: PropertyType) -> Result<Option<bool>, CoreError> {
        Ok(self.value(property)?.as_ref().and_then(Value::as_bool))
    }

    pub fn number(&self, property: PropertyType) -> Result<Option<f64>, CoreError> {
        Ok(self.value(property)?.as_ref().and_then(Value::as_number))
    }

    /// Write a property through its set binding.
    pub async fn set(&self, property: PropertyType, value: Value) -> Result<(), CoreError> {
        self.inner.ensure_alive()?;
        let binding = self
            .inner
            .properties
            .get(&property)
            .and_then(BindingPair::write)
            .ok_or_else(|| self.inner.not_bound(property))?;
        binding.set_value(value).await
    }

    /// The binding a property is read from, for diagnostics.
    pub fn binding(&self, property: PropertyType) -> Result<Option<Arc<StateBinding>>, CoreError> {
        self.inner.ensure_alive()?;
        Ok(self
            .inner
            .properties
            .get(&property)
            .and_then(BindingPair::read)
            .cloned())
    }

    /// Declared properties whose required bindings never resolved.
    pub fn unresolved(&self) -> Result<Vec<PropertyType>, CoreError> {
        self.inner.ensure_alive()?;
        Ok(self
            .inner
            .properties
            .iter()
            .filter(|(_, pair)| pair.is_unresolved())
            .map(|(property, _)| *property)
            .collect())
    }

    // ── Maintenance ──────────────────────────────────────────────────

    pub fn unreachable(&self) -> Result<Option<bool>, CoreError> {
        self.bool(PropertyType::Unreachable)
    }

    pub fn low_battery(&self) -> Result<Option<bool>, CoreError> {
        self.bool(PropertyType::LowBattery)
    }

    pub fn maintenance(&self) -> Result<Option<bool>, CoreError> {
        self.bool(PropertyType::Maintenance)
    }

    pub fn working(&self) -> Result<Option<bool>, CoreError> {
        self.bool(PropertyType::Working)
    }

    pub fn error(&self) -> Result<Option<bool>, CoreError> {
        self.bool(PropertyType::Error)
    }

    // ── Change notification ──────────────────────────────────────────

    /// Register a synchronous listener. It runs once per binding update, in
    /// the order the store delivers them.
    pub fn on_change(&self, listener: ChangeListener) -> Result<(), CoreError> {
        self.inner.ensure_alive()?;
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
        Ok(())
    }

    /// Async view of the same change stream. Receivers that fall more than
    /// a channel's worth behind skip events; use [`Self::on_change`] when
    /// every change matters.
    pub fn subscribe(&self) -> Result<broadcast::Receiver<DeviceEvent>, CoreError> {
        self.inner.ensure_alive()?;
        Ok(self.inner.events.subscribe())
    }

    /// Token cancelled when the device is destroyed.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    /// Resolves once the device has been destroyed.
    pub async fn closed(&self) {
        self.inner.cancel.cancelled().await;
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Unsubscribe every binding, drop all listeners and cancel the device
    /// token. Idempotent.
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.release_subscriptions();
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.inner.cancel.cancel();
        info!(device = %self.inner.id, kind = self.inner.kind, "device destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::Acquire)
    }
}

impl DeviceInner {
    fn ensure_alive(&self) -> Result<(), CoreError> {
        if self.destroyed.load(Ordering::Acquire) {
            Err(CoreError::DeviceDestroyed {
                device: self.id.clone(),
            })
        } else {
            Ok(())
        }
    }

    fn not_bound(&self, property: PropertyType) -> CoreError {
        CoreError::PropertyNotBound {
            device: self.id.clone(),
            property,
        }
    }

    fn bound_properties(&self) -> Vec<PropertyType> {
        self.properties
            .iter()
            .filter(|(_, pair)| pair.read().is_some())
            .map(|(property, _)| *property)
            .collect()
    }

    fn on_store_update(&self, binding: &StateBinding, raw: &serde_json::Value) {
        if self.destroyed.load(Ordering::Acquire) {
            return;
        }
        let property = binding.property();
        let coerced = binding.apply_update(raw);
        // Report what `value()` returns: a bound actual state shadows the set one.
        let value = match self.properties.get(&property).and_then(BindingPair::read) {
            Some(read) if !std::ptr::eq(read.as_ref(), binding) => read.value(),
            _ => coerced,
        };
        let event = DeviceEvent { property, value };
        trace!(device = %self.id, key = binding.key(), ?event, "property changed");

        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in &listeners {
            listener(&event);
        }
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    fn release_subscriptions(&self) {
        let ids = std::mem::take(
            &mut *self
                .subscriptions
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for id in ids {
            self.store.unsubscribe(id);
        }
    }
}

impl Drop for DeviceInner {
    fn drop(&mut self) {
        self.release_subscriptions();
        self.cancel.cancel();
    }
}

// ── DeviceBuilder ────────────────────────────────────────────────────

/// Resolves descriptor groups into a [`GenericDevice`].
///
/// Groups resolve one after another; descriptors within a group resolve
/// concurrently. A later descriptor for the same property and role
/// replaces an earlier one.
pub struct DeviceBuilder {
    id: String,
    name: String,
    kind: &'static str,
    states: Vec<(String, String)>,
    store: Arc<dyn StateStore>,
    steps: Vec<&'static [BindingDescriptor]>,
}

impl DeviceBuilder {
    pub fn new(detected: &DetectedDevice, store: Arc<dyn StateStore>) -> Self {
        Self {
            id: detected.id.clone(),
            name: detected.display_name().to_owned(),
            kind: "generic",
            states: detected
                .states
                .iter()
                .filter_map(|s| s.id.clone().map(|id| (s.name.clone(), id)))
                .collect(),
            store,
            steps: Vec::new(),
        }
    }

    pub fn kind(mut self, kind: &'static str) -> Self {
        self.kind = kind;
        self
    }

    /// Append a descriptor group.
    pub fn step(mut self, group: &'static [BindingDescriptor]) -> Self {
        self.steps.push(group);
        self
    }

    pub async fn build(self) -> GenericDevice {
        let mut properties: BTreeMap<PropertyType, BindingPair> = BTreeMap::new();

        for group in &self.steps {
            let slots = join_all(group.iter().map(|d| self.resolve(d))).await;
            for (descriptor, slot) in group.iter().zip(slots) {
                *properties
                    .entry(descriptor.property)
                    .or_default()
                    .slot_mut(descriptor.role) = Some(slot);
            }
        }

        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let inner = Arc::new(DeviceInner {
            id: self.id,
            name: self.name,
            kind: self.kind,
            properties,
            store: self.store,
            subscriptions: Mutex::new(Vec::new()),
            listeners: RwLock::new(Vec::new()),
            events,
            destroyed: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        });

        let weak = Arc::downgrade(&inner);
        let ids: Vec<SubscriptionId> = inner
            .properties
            .values()
            .flat_map(BindingPair::bindings)
            .map(|binding| {
                inner
                    .store
                    .subscribe(binding.key(), store_listener(&weak, binding))
            })
            .collect();
        *inner
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = ids;

        let device = GenericDevice { inner };
        debug!(
            device = %device.id(),
            kind = device.kind(),
            properties = ?device.inner.bound_properties(),
            "device built"
        );
        device
    }

    async fn resolve(&self, descriptor: &BindingDescriptor) -> Slot {
        let missing = || {
            if descriptor.required {
                warn!(device = %self.id, role = descriptor.name, "required state not found");
                Slot::Unresolved
            } else {
                Slot::Absent
            }
        };

        let Some(key) = self
            .states
            .iter()
            .find(|(name, _)| name == descriptor.name)
            .map(|(_, key)| key.as_str())
        else {
            return missing();
        };

        match StateBinding::resolve(Arc::clone(&self.store), key, descriptor).await {
            Ok(Some(binding)) => Slot::Bound(Arc::new(binding)),
            Ok(None) => missing(),
            Err(e) => {
                warn!(device = %self.id, key, error = %e, "state lookup failed");
                Slot::Unresolved
            }
        }
    }
}

fn store_listener(device: &Weak<DeviceInner>, binding: &Arc<StateBinding>) -> StateListener {
    let device = Weak::clone(device);
    let binding = Arc::clone(binding);
    Arc::new(move |_key, raw| {
        if let Some(device) = device.upgrade() {
            device.on_store_update(&binding, raw);
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::model::{AccessType, ValueType};
    use crate::store::MemoryStore;

    static POWER: [BindingDescriptor; 2] = [
        BindingDescriptor::new("ON_ACTUAL", PropertyType::Power, ValueType::Boolean, AccessType::Read)
            .actual(),
        BindingDescriptor::new("ON", PropertyType::Power, ValueType::Boolean, AccessType::ReadWrite)
            .required(),
    ];
    static LEVEL: [BindingDescriptor; 1] = [BindingDescriptor::new(
        "LEVEL",
        PropertyType::Level,
        ValueType::NumberPercent,
        AccessType::ReadWrite,
    )
    .required()];

    async fn build(store: &Arc<MemoryStore>, detected: &DetectedDevice) -> GenericDevice {
        let dyn_store: Arc<dyn StateStore> = store.clone();
        DeviceBuilder::new(detected, dyn_store)
            .kind("test")
            .step(&POWER)
            .step(&LEVEL)
            .build()
            .await
    }

    #[tokio::test]
    async fn reads_fall_back_to_set_binding() {
        let store = Arc::new(MemoryStore::new());
        store.insert("dev.on", json!(true));
        let detected = DetectedDevice::new("dev", "test").with_state("ON", "dev.on");

        let device = build(&store, &detected).await;

        assert_eq!(device.bool(PropertyType::Power).unwrap(), Some(true));
        assert!(device.has(PropertyType::Power).unwrap());
        assert!(!device.has(PropertyType::Level).unwrap());
        assert_eq!(device.unresolved().unwrap(), vec![PropertyType::Level]);
    }

    #[tokio::test]
    async fn unbound_property_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        let detected = DetectedDevice::new("dev", "test");
        let device = build(&store, &detected).await;

        let err = device.value(PropertyType::Level).unwrap_err();
        assert!(matches!(
            err,
            CoreError::PropertyNotBound { property: PropertyType::Level, .. }
        ));
        assert!(matches!(
            device.value(PropertyType::Hue),
            Err(CoreError::PropertyNotBound { .. })
        ));
    }

    #[tokio::test]
    async fn listeners_see_every_update_in_order() {
        let store = Arc::new(MemoryStore::new());
        store.insert("dev.on", json!(false));
        store.insert("dev.level", json!(0));
        let detected = DetectedDevice::new("dev", "test")
            .with_state("ON", "dev.on")
            .with_state("LEVEL", "dev.level");
        let device = build(&store, &detected).await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        device
            .on_change(Arc::new(move |event| sink.lock().unwrap().push(event.clone())))
            .unwrap();

        store.update("dev.level", json!(30));
        store.update("dev.on", json!(true));
        store.update("dev.level", json!("nonsense"));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                DeviceEvent { property: PropertyType::Level, value: Some(Value::Number(30.0)) },
                DeviceEvent { property: PropertyType::Power, value: Some(Value::Bool(true)) },
                DeviceEvent { property: PropertyType::Level, value: None },
            ]
        );
    }

    #[tokio::test]
    async fn broadcast_receivers_get_events() {
        let store = Arc::new(MemoryStore::new());
        store.insert("dev.on", json!(false));
        let detected = DetectedDevice::new("dev", "test").with_state("ON", "dev.on");
        let device = build(&store, &detected).await;

        let mut rx = device.subscribe().unwrap();
        store.update("dev.on", json!(true));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.property, PropertyType::Power);
        assert_eq!(event.value, Some(Value::Bool(true)));
    }

    #[tokio::test]
    async fn destroy_unsubscribes_and_blocks_access() {
        let store = Arc::new(MemoryStore::new());
        store.insert("dev.on", json!(false));
        let detected = DetectedDevice::new("dev", "test").with_state("ON", "dev.on");
        let device = build(&store, &detected).await;
        assert_eq!(store.subscriber_count("dev.on"), 1);

        device.destroy();
        device.destroy();

        assert_eq!(store.subscriber_count("dev.on"), 0);
        assert!(device.shutdown_token().is_cancelled());
        assert!(matches!(
            device.bool(PropertyType::Power),
            Err(CoreError::DeviceDestroyed { .. })
        ));
        assert!(matches!(
            device.set(PropertyType::Power, Value::Bool(true)).await,
            Err(CoreError::DeviceDestroyed { .. })
        ));
        assert!(device.subscribe().is_err());
        assert!(matches!(
            device.has(PropertyType::Power),
            Err(CoreError::DeviceDestroyed { .. })
        ));
        assert!(device.property_names().is_err());
        assert!(device.binding(PropertyType::Power).is_err());
        assert!(device.unresolved().is_err());
    }

    #[tokio::test]
    async fn set_state_echo_reports_the_actual_value() {
        let store = Arc::new(MemoryStore::new());
        store.insert("dev.on_actual", json!(false));
        store.insert("dev.on", json!(false));
        let detected = DetectedDevice::new("dev", "test")
            .with_state("ON_ACTUAL", "dev.on_actual")
            .with_state("ON", "dev.on");
        let device = build(&store, &detected).await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        device
            .on_change(Arc::new(move |event| sink.lock().unwrap().push(event.value.clone())))
            .unwrap();

        store.update("dev.on", json!(true));
        store.update("dev.on_actual", json!(true));

        assert_eq!(*seen.lock().unwrap(), vec![Some(Value::Bool(false)), Some(Value::Bool(true))]);
        assert_eq!(device.bool(PropertyType::Power).unwrap(), Some(true));
    }

    #[tokio::test]
    async fn dropping_last_handle_releases_subscriptions() {
        let store = Arc::new(MemoryStore::new());
        store.insert("dev.on", json!(false));
        let detected = DetectedDevice::new("dev", "test").with_state("ON", "dev.on");

        let device = build(&store, &detected).await;
        drop(device);

        assert_eq!(store.subscriber_count("dev.on"), 0);
    }
}
