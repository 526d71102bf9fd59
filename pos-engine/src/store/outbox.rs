//! Notification outbox
//!
//! Events are appended in the same write transaction as the change they
//! describe, so a rolled-back transaction never leaks a notification. The
//! dispatcher drains them after commit.

use super::{COUNTERS_TABLE, OUTBOX_TABLE, Store, StorageResult};
use redb::{ReadableDatabase, ReadableTable, WriteTransaction};
use serde::{Deserialize, Serialize};
use shared::NotificationEvent;

const OUTBOX_SEQ_KEY: &str = "outbox_seq";

/// Pending notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxRecord {
    pub seq: u64,
    pub event: NotificationEvent,
    pub created_at: i64,
    /// Failed delivery attempts so far
    #[serde(default)]
    pub attempts: u32,
}

impl Store {
    /// Append an event inside the caller's transaction
    pub fn append_event(
        &self,
        txn: &WriteTransaction,
        event: &NotificationEvent,
    ) -> StorageResult<u64> {
        let seq = {
            let mut counters = txn.open_table(COUNTERS_TABLE)?;
            let next = counters.get(OUTBOX_SEQ_KEY)?.map(|g| g.value()).unwrap_or(0) + 1;
            counters.insert(OUTBOX_SEQ_KEY, next)?;
            next as u64
        };

        let record = OutboxRecord {
            seq,
            event: event.clone(),
            created_at: shared::util::now_millis(),
            attempts: 0,
        };
        let bytes = serde_json::to_vec(&record)?;
        let mut table = txn.open_table(OUTBOX_TABLE)?;
        table.insert(seq, bytes.as_slice())?;
        Ok(seq)
    }

    /// Oldest pending events, in sequence order
    pub fn pending_events(&self, limit: usize) -> StorageResult<Vec<OutboxRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(OUTBOX_TABLE)?;
        let mut records = Vec::new();
        for entry in table.iter()?.take(limit) {
            let (_, value) = entry?;
            records.push(serde_json::from_slice(value.value())?);
        }
        Ok(records)
    }

    pub fn pending_event_count(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(OUTBOX_TABLE)?;
        let mut count = 0;
        for entry in table.iter()? {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    /// Delete a delivered (or abandoned) event
    pub fn remove_event(&self, seq: u64) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(OUTBOX_TABLE)?;
            table.remove(seq)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Record a failed delivery attempt, returns the new attempt count
    pub fn bump_attempts(&self, seq: u64) -> StorageResult<u32> {
        let txn = self.db.begin_write()?;
        let attempts = {
            let mut table = txn.open_table(OUTBOX_TABLE)?;
            let record: Option<OutboxRecord> = match table.get(seq)? {
                Some(guard) => Some(serde_json::from_slice(guard.value())?),
                None => None,
            };
            match record {
                Some(mut record) => {
                    record.attempts += 1;
                    let bytes = serde_json::to_vec(&record)?;
                    table.insert(seq, bytes.as_slice())?;
                    record.attempts
                }
                None => 0,
            }
        };
        txn.commit()?;
        Ok(attempts)
    }
}
