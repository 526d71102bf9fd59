//! Notifications
//!
//! ```text
//! write txn ──▶ outbox table ──commit──▶ outbox_signal
//!                                            │
//!                                   OutboxDispatcher (drain in seq order)
//!                                            │
//!                                       dyn Notifier ──▶ subscribers
//! ```
//!
//! Events are written to the outbox in the same transaction as the state
//! change that produced them, so a committed change always has its event and
//! a rolled-back one never does. Delivery happens afterwards and never blocks
//! the caller.

mod dispatcher;

pub use dispatcher::{DispatcherConfig, OutboxDispatcher};

use async_trait::async_trait;
use shared::NotificationEvent;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// Delivery seam for engine events
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &NotificationEvent) -> Result<(), NotifyError>;
}

/// In-process fan-out over a broadcast channel
///
/// Having no subscribers is not an error; the event is simply dropped.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<NotificationEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl Notifier for BroadcastNotifier {
    async fn notify(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        if self.tx.send(event.clone()).is_err() {
            debug!(event = event.name(), "No subscribers, event dropped");
        }
        Ok(())
    }
}
