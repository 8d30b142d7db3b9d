// ── State bindings ──
//
// A binding ties one semantic property of one device to one key in the
// state store. Bindings are declared through `BindingDescriptor`s and
// resolved asynchronously by the device builder.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tracing::debug;

use crate::error::CoreError;
use crate::model::{AccessType, PropertyType, StateMeta, Value, ValueType};
use crate::store::{StateStore, StoreError};

/// Which side of a property a binding serves.
///
/// A property may be bound twice: a `Set` binding receives writes, an
/// `Actual` binding reports what the device really did. Reads prefer
/// `Actual` and fall back to `Set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingRole {
    Set,
    Actual,
}

/// Declaration of one binding a device kind wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingDescriptor {
    /// Role name as reported by type detection (`ON`, `ON_ACTUAL`, ...).
    pub name: &'static str,
    pub property: PropertyType,
    pub value_type: ValueType,
    pub access: AccessType,
    pub role: BindingRole,
    pub required: bool,
}

impl BindingDescriptor {
    pub const fn new(
        name: &'static str,
        property: PropertyType,
        value_type: ValueType,
        access: AccessType,
    ) -> Self {
        Self {
            name,
            property,
            value_type,
            access,
            role: BindingRole::Set,
            required: false,
        }
    }

    /// Mark as the dedicated read-target for its property.
    pub const fn actual(mut self) -> Self {
        self.role = BindingRole::Actual;
        self
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// A resolved binding between a property and a store key.
pub struct StateBinding {
    key: String,
    property: PropertyType,
    value_type: ValueType,
    access: AccessType,
    meta: StateMeta,
    value: ArcSwapOption<Value>,
    store: Arc<dyn StateStore>,
}

impl std::fmt::Debug for StateBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateBinding")
            .field("key", &self.key)
            .field("property", &self.property)
            .field("value_type", &self.value_type)
            .field("access", &self.access)
            .field("value", &self.value())
            .finish_non_exhaustive()
    }
}

impl StateBinding {
    /// Look up `key` and build a binding for it.
    ///
    /// Returns `Ok(None)` when the store has no such state.
    pub async fn resolve(
        store: Arc<dyn StateStore>,
        key: &str,
        descriptor: &BindingDescriptor,
    ) -> Result<Option<Self>, StoreError> {
        let Some(meta) = store.describe(key).await? else {
            return Ok(None);
        };
        let raw = store.get(key).await?;

        let binding = Self {
            key: key.to_owned(),
            property: descriptor.property,
            value_type: descriptor.value_type,
            access: descriptor.access,
            meta,
            value: ArcSwapOption::empty(),
            store,
        };
        if let Some(raw) = raw {
            binding.apply_update(&raw);
        }

        debug!(
            key,
            property = %binding.property,
            access = %binding.access,
            "binding resolved"
        );
        Ok(Some(binding))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn property(&self) -> PropertyType {
        self.property
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn access(&self) -> AccessType {
        self.access
    }

    pub fn meta(&self) -> &StateMeta {
        &self.meta
    }

    /// Last value reported by the store, if any.
    pub fn value(&self) -> Option<Value> {
        self.value.load_full().map(|v| (*v).clone())
    }

    /// Write a value to the store.
    ///
    /// Fails with [`CoreError::AccessDenied`] on read-only bindings and with
    /// [`CoreError::InvalidValue`] if the value violates the value type. The
    /// cached value is not touched; it changes when the store reports back.
    pub async fn set_value(&self, value: Value) -> Result<(), CoreError> {
        if !self.access.is_writable() {
            return Err(CoreError::AccessDenied {
                key: self.key.clone(),
            });
        }

        self.value_type
            .validate(&value, &self.meta)
            .map_err(|reason| CoreError::InvalidValue {
                key: self.key.clone(),
                reason,
            })?;

        debug!(key = %self.key, %value, "writing state");
        self.store.set(&self.key, value.to_json()).await?;
        Ok(())
    }

    /// Coerce and cache a raw store value; returns the typed value.
    pub(crate) fn apply_update(&self, raw: &serde_json::Value) -> Option<Value> {
        let value = self.value_type.coerce(raw);
        if value.is_none() && !raw.is_null() {
            debug!(key = %self.key, %raw, value_type = %self.value_type, "ignoring uncoercible value");
        }
        self.value.store(value.clone().map(Arc::new));
        value
    }
}

// ── Slots ────────────────────────────────────────────────────────────

/// Resolution outcome of a declared binding.
#[derive(Debug, Clone)]
pub(crate) enum Slot {
    Bound(Arc<StateBinding>),
    /// Optional and not present on this device.
    Absent,
    /// Required but not found, or the lookup failed.
    Unresolved,
}

impl Slot {
    fn binding(&self) -> Option<&Arc<StateBinding>> {
        match self {
            Self::Bound(b) => Some(b),
            Self::Absent | Self::Unresolved => None,
        }
    }
}

/// Set/actual bindings of one property.
#[derive(Debug, Clone, Default)]
pub(crate) struct BindingPair {
    pub(crate) set: Option<Slot>,
    pub(crate) actual: Option<Slot>,
}

impl BindingPair {
    /// Preferred-binding resolution: the dedicated read-target if it resolved,
    /// otherwise the write-target.
    pub(crate) fn read(&self) -> Option<&Arc<StateBinding>> {
        self.actual
            .as_ref()
            .and_then(Slot::binding)
            .or_else(|| self.set.as_ref().and_then(Slot::binding))
    }

    pub(crate) fn write(&self) -> Option<&Arc<StateBinding>> {
        self.set.as_ref().and_then(Slot::binding)
    }

    pub(crate) fn slot_mut(&mut self, role: BindingRole) -> &mut Option<Slot> {
        match role {
            BindingRole::Set => &mut self.set,
            BindingRole::Actual => &mut self.actual,
        }
    }

    pub(crate) fn bindings(&self) -> impl Iterator<Item = &Arc<StateBinding>> {
        self.set
            .iter()
            .chain(self.actual.iter())
            .filter_map(Slot::binding)
    }

    pub(crate) fn is_unresolved(&self) -> bool {
        self.read().is_none()
            && [&self.set, &self.actual]
                .into_iter()
                .any(|s| matches!(s, Some(Slot::Unresolved)))
    }
}
