//! Notification events emitted by the request workflow.
//!
//! The workflow only signals that a notification is due; delivery belongs to
//! a [`Notifier`] implementation. The default wiring fans events out on a
//! tokio broadcast bus (tests subscribe to it) and the request routes also
//! persist each event to the `notifications` table for later listing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestEvent {
    Approved {
        emp_id: Uuid,
        request_type: String,
        approver_name: String,
    },
    Rejected {
        emp_id: Uuid,
        request_type: String,
        approver_name: String,
    },
}

impl RequestEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Approved { .. } => "request_approved",
            Self::Rejected { .. } => "request_rejected",
        }
    }

    /// The employee the notification is addressed to (the submitter).
    pub fn recipient(&self) -> Uuid {
        match self {
            Self::Approved { emp_id, .. } | Self::Rejected { emp_id, .. } => *emp_id,
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &RequestEvent) -> Result<(), AppError>;
}

pub type EventBus = broadcast::Sender<Value>;

pub fn init_event_bus() -> (EventBus, broadcast::Receiver<Value>) {
    broadcast::channel(1024)
}

/// Broadcast-backed notifier. Lagging or absent receivers are not an error;
/// delivery guarantees belong to a real mail/push collaborator.
#[derive(Clone)]
pub struct BusNotifier {
    bus: EventBus,
}

impl BusNotifier {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl Notifier for BusNotifier {
    async fn notify(&self, event: &RequestEvent) -> Result<(), AppError> {
        let payload = serde_json::to_value(event)
            .map_err(|err| AppError::internal(format!("failed to serialize event: {err}")))?;

        if self.bus.send(payload).is_err() {
            tracing::debug!(event = event.name(), "no notification subscribers");
        }

        Ok(())
    }
}
