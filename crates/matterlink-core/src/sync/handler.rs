// ── Sync handler ──
//
// Keeps one endpoint attribute set in step with one device property:
// an initial projection on attach, then one projection per change
// event until the device is destroyed. Changes reach the handler through
// an unbounded queue fed by a device listener.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{Endpoint, EndpointError, Projection};
use crate::device::{DeviceEvent, GenericDevice};
use crate::error::CoreError;

/// Outcome of [`SyncHandler::attach`].
#[derive(Debug)]
pub enum SyncStatus {
    /// The device does not have the watched property; nothing was projected.
    NotApplicable,
    /// Projection task running until the device is destroyed.
    Active(JoinHandle<()>),
}

impl SyncStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    pub fn into_task(self) -> Option<JoinHandle<()>> {
        match self {
            Self::Active(task) => Some(task),
            Self::NotApplicable => None,
        }
    }
}

pub struct SyncHandler<P> {
    projection: Arc<P>,
}

impl<P: Projection> SyncHandler<P> {
    pub fn new(projection: P) -> Self {
        Self {
            projection: Arc::new(projection),
        }
    }

    /// Start projecting the watched property of `device` onto `endpoint`.
    ///
    /// Changes are queued from before the current value is read, and one
    /// task applies the initial projection and then every queued change,
    /// so endpoint writes keep the order of the device changes. A failed
    /// initial projection stops the handler and is returned as
    /// [`CoreError::ProjectionFailed`]; later failures are logged and
    /// skipped.
    pub async fn attach(
        &self,
        device: &GenericDevice,
        endpoint: Arc<dyn Endpoint>,
    ) -> Result<SyncStatus, CoreError> {
        let property = self.projection.property();
        if !device.has(property)? {
            debug!(device = %device.id(), %property, "property absent, handler not attached");
            return Ok(SyncStatus::NotApplicable);
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        device.on_change(Arc::new(move |event: &DeviceEvent| {
            if event.property == property {
                // Closed once the handler has stopped.
                let _ = tx.send(event.value.clone());
            }
        }))?;
        let current = device.value(property)?;

        let cancel = device.shutdown_token();
        let projection = Arc::clone(&self.projection);
        let device_id = device.id().to_owned();
        let (ready_tx, ready_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            if let Some(patch) = projection.project(current.as_ref()) {
                if let Err(e) = endpoint.set(patch).await {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            }
            let _ = ready_tx.send(Ok(()));

            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    next = rx.recv() => {
                        let Some(value) = next else { break };
                        let Some(patch) = projection.project(value.as_ref()) else {
                            continue;
                        };
                        if let Err(e) = endpoint.set(patch).await {
                            warn!(device = %device_id, %property, error = %e, "projection failed");
                        }
                    }
                }
            }
            debug!(device = %device_id, %property, "sync handler stopped");
        });

        let initial = ready_rx.await.unwrap_or_else(|_| {
            Err(EndpointError("sync handler stopped before projecting".into()))
        });
        if let Err(e) = initial {
            return Err(CoreError::ProjectionFailed {
                property,
                reason: e.to_string(),
            });
        }

        debug!(device = %device.id(), %property, "sync handler attached");
        Ok(SyncStatus::Active(task))
    }
}
