//! Outbox dispatcher
//!
//! Single background task. Wakes on every commit (or on the scan interval),
//! drains pending events in sequence order and deletes each one once the
//! notifier accepts it. A failing event blocks the ones behind it until it
//! succeeds or runs out of attempts, which keeps per-entity ordering intact.

use super::Notifier;
use crate::store::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Fallback scan period when no commit signal arrives
    pub scan_interval: Duration,
    /// Events read per drain pass
    pub batch_size: usize,
    /// Delivery attempts before an event is dropped
    pub max_attempts: u32,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(5),
            batch_size: 100,
            max_attempts: 3,
        }
    }
}

pub struct OutboxDispatcher {
    store: Store,
    notifier: Arc<dyn Notifier>,
    config: DispatcherConfig,
}

impl OutboxDispatcher {
    pub fn new(store: Store, notifier: Arc<dyn Notifier>, config: DispatcherConfig) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    /// 主循环：提交信号 + 定时扫描 + 关机信号
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            scan_interval_ms = self.config.scan_interval.as_millis() as u64,
            "Outbox dispatcher started"
        );

        let signal = self.store.outbox_signal();
        let mut interval = tokio::time::interval(self.config.scan_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            self.drain().await;

            tokio::select! {
                _ = signal.notified() => {}
                _ = interval.tick() => {}
                _ = shutdown.cancelled() => {
                    // 关机前最后投递一次
                    self.drain().await;
                    info!("Outbox dispatcher received shutdown signal");
                    return;
                }
            }
        }
    }

    /// Drain until the outbox is empty or an event is left for retry
    pub async fn drain(&self) -> usize {
        let mut total = 0;
        loop {
            let (delivered, complete) = self.drain_once().await;
            total += delivered;
            if !complete {
                return total;
            }
        }
    }

    /// One pass over at most `batch_size` events
    ///
    /// Returns the number delivered and whether another pass may find more.
    async fn drain_once(&self) -> (usize, bool) {
        let records = match self.store.pending_events(self.config.batch_size) {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "Failed to read outbox");
                return (0, false);
            }
        };
        if records.is_empty() {
            return (0, false);
        }
        let full_batch = records.len() == self.config.batch_size;

        let mut delivered = 0;
        for record in records {
            match self.notifier.notify(&record.event).await {
                Ok(()) => {
                    if let Err(e) = self.store.remove_event(record.seq) {
                        error!(seq = record.seq, error = %e, "Failed to remove delivered event");
                        return (delivered, false);
                    }
                    delivered += 1;
                }
                Err(e) => {
                    let attempts = match self.store.bump_attempts(record.seq) {
                        Ok(attempts) => attempts,
                        Err(e) => {
                            error!(seq = record.seq, error = %e, "Failed to record delivery attempt");
                            return (delivered, false);
                        }
                    };
                    if attempts < self.config.max_attempts {
                        debug!(
                            seq = record.seq,
                            attempts,
                            error = %e,
                            "Notification failed, will retry"
                        );
                        return (delivered, false);
                    }
                    warn!(
                        seq = record.seq,
                        event = record.event.name(),
                        attempts,
                        error = %e,
                        "Dropping notification after repeated failures"
                    );
                    if let Err(e) = self.store.remove_event(record.seq) {
                        error!(seq = record.seq, error = %e, "Failed to drop event");
                        return (delivered, false);
                    }
                }
            }
        }
        (delivered, full_batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{BroadcastNotifier, NotifyError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use shared::NotificationEvent;

    fn cancelled(order_id: i64) -> NotificationEvent {
        NotificationEvent::OrderCancelled {
            order_id,
            table_id: 1,
        }
    }

    fn append(store: &Store, events: &[NotificationEvent]) {
        let txn = store.begin_write().unwrap();
        for event in events {
            store.append_event(&txn, event).unwrap();
        }
        store.commit(txn).unwrap();
    }

    /// Fails the first `failures` calls, then records
    struct FlakyNotifier {
        failures: Mutex<u32>,
        delivered: Mutex<Vec<NotificationEvent>>,
    }

    impl FlakyNotifier {
        fn new(failures: u32) -> Self {
            Self {
                failures: Mutex::new(failures),
                delivered: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Notifier for FlakyNotifier {
        async fn notify(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
            let mut failures = self.failures.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(NotifyError::Delivery("subscriber gone".into()));
            }
            self.delivered.lock().push(event.clone());
            Ok(())
        }
    }

    fn config(batch_size: usize) -> DispatcherConfig {
        DispatcherConfig {
            batch_size,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_drain_in_order() {
        let store = Store::open_in_memory().unwrap();
        append(&store, &[cancelled(1), cancelled(2), cancelled(3)]);
        let notifier = Arc::new(FlakyNotifier::new(0));
        let dispatcher = OutboxDispatcher::new(store.clone(), notifier.clone(), config(2));

        assert_eq!(dispatcher.drain().await, 3);
        assert_eq!(
            *notifier.delivered.lock(),
            vec![cancelled(1), cancelled(2), cancelled(3)]
        );
        assert_eq!(store.pending_event_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failure_blocks_later_events_until_retry() {
        let store = Store::open_in_memory().unwrap();
        append(&store, &[cancelled(1), cancelled(2)]);
        let notifier = Arc::new(FlakyNotifier::new(1));
        let dispatcher = OutboxDispatcher::new(store.clone(), notifier.clone(), config(10));

        assert_eq!(dispatcher.drain().await, 0);
        assert_eq!(store.pending_event_count().unwrap(), 2);
        assert_eq!(store.pending_events(1).unwrap()[0].attempts, 1);

        assert_eq!(dispatcher.drain().await, 2);
        assert_eq!(*notifier.delivered.lock(), vec![cancelled(1), cancelled(2)]);
    }

    #[tokio::test]
    async fn test_event_dropped_after_max_attempts() {
        let store = Store::open_in_memory().unwrap();
        append(&store, &[cancelled(1), cancelled(2)]);
        let notifier = Arc::new(FlakyNotifier::new(3));
        let dispatcher = OutboxDispatcher::new(store.clone(), notifier.clone(), config(10));

        dispatcher.drain().await;
        dispatcher.drain().await;
        // third failure drops event 1, event 2 goes through
        assert_eq!(dispatcher.drain().await, 1);
        assert_eq!(*notifier.delivered.lock(), vec![cancelled(2)]);
        assert_eq!(store.pending_event_count().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_delivers_on_commit_and_stops() {
        let store = Store::open_in_memory().unwrap();
        let notifier = Arc::new(BroadcastNotifier::new(16));
        let mut rx = notifier.subscribe();
        let shutdown = CancellationToken::new();

        let dispatcher =
            OutboxDispatcher::new(store.clone(), notifier.clone(), DispatcherConfig::default());
        let handle = tokio::spawn(dispatcher.run(shutdown.clone()));

        append(&store, &[cancelled(7)]);
        assert_eq!(rx.recv().await.unwrap(), cancelled(7));

        append(&store, &[cancelled(8)]);
        assert_eq!(rx.recv().await.unwrap(), cancelled(8));

        shutdown.cancel();
        handle.await.unwrap();
        assert_eq!(store.pending_event_count().unwrap(), 0);
    }
}
