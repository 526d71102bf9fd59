//! redb-based transactional store
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `dining_tables` | `table_id` | `DiningTable` | Tables and occupancy |
//! | `categories` | `category_id` | `Category` | Menu categories (buffet pricing) |
//! | `menu_items` | `menu_item_id` | `MenuItem` | Menu items |
//! | `orders` | `order_id` | `Order` | Orders with their items |
//! | `orders_by_table` | `(table_id, order_id)` | `()` | Table → orders index |
//! | `payments` | `payment_id` | `Payment` | Payments (insert-only) |
//! | `payment_by_order` | `order_id` | `payment_id` | At most one payment per order |
//! | `printers` | `printer_id` | `PrinterConfig` | Printer + category routing (schema v2) |
//! | `outbox` | `seq` | `OutboxRecord` | Pending notifications |
//! | `counters` | name | `i64` | ID allocation |
//! | `meta` | name | `u64` | Schema version |
//!
//! Every multi-row mutation runs inside one write transaction; redb allows a
//! single writer at a time, so reads made through a `*_txn` accessor see
//! the transaction's own earlier writes and nothing uncommitted from
//! anyone else.

mod catalog;
mod orders;
mod outbox;

pub use outbox::OutboxRecord;

use redb::{
    Database, ReadableDatabase, ReadableTable, TableDefinition, TableError, WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::Notify;

/// JSON-valued table keyed by entity id
type JsonTable = TableDefinition<'static, i64, &'static [u8]>;

const DINING_TABLES_TABLE: JsonTable = TableDefinition::new("dining_tables");
const CATEGORIES_TABLE: JsonTable = TableDefinition::new("categories");
const MENU_ITEMS_TABLE: JsonTable = TableDefinition::new("menu_items");
const ORDERS_TABLE: JsonTable = TableDefinition::new("orders");
const PAYMENTS_TABLE: JsonTable = TableDefinition::new("payments");
const PRINTERS_TABLE: JsonTable = TableDefinition::new("printers");

/// Index: (table_id, order_id) -> ()
const ORDERS_BY_TABLE_TABLE: TableDefinition<(i64, i64), ()> =
    TableDefinition::new("orders_by_table");

/// Unique index: order_id -> payment_id
const PAYMENT_BY_ORDER_TABLE: TableDefinition<i64, i64> = TableDefinition::new("payment_by_order");

/// Outbox: seq -> JSON-serialized OutboxRecord
const OUTBOX_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("outbox");

const COUNTERS_TABLE: TableDefinition<&str, i64> = TableDefinition::new("counters");
const META_TABLE: TableDefinition<&str, u64> = TableDefinition::new("meta");

const SCHEMA_VERSION_KEY: &str = "schema_version";

/// Schema version 1: core order/payment tables only
pub const SCHEMA_V1: u64 = 1;
/// Schema version 2: adds printer configuration and category routing
pub const SCHEMA_V2: u64 = 2;
pub const CURRENT_SCHEMA_VERSION: u64 = SCHEMA_V2;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Feature unavailable in schema v{schema_version}: {feature}")]
    FeatureUnavailable {
        feature: &'static str,
        schema_version: u64,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// What the opened database supports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub schema_version: u64,
    /// Printer configuration and category → printer mapping are stored
    pub printer_routing: bool,
}

impl Capabilities {
    fn for_version(schema_version: u64) -> Self {
        Self {
            schema_version,
            printer_routing: schema_version >= SCHEMA_V2,
        }
    }
}

/// Transactional store backed by redb
#[derive(Clone)]
pub struct Store {
    db: Arc<Database>,
    schema_version: Arc<AtomicU64>,
    outbox_signal: Arc<Notify>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("schema_version", &self.schema_version.load(Ordering::Acquire))
            .finish()
    }
}

impl Store {
    /// Open or create the database at the given path
    ///
    /// A new database gets the current schema. An existing one keeps the
    /// version it was written with; call [`Store::upgrade_schema`] to
    /// migrate it.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db, CURRENT_SCHEMA_VERSION)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db, CURRENT_SCHEMA_VERSION)
    }

    /// Open an in-memory database with an older schema (for testing upgrades)
    pub fn open_in_memory_with_schema(version: u64) -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db, version)
    }

    fn init(db: Database, new_db_version: u64) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        let version = {
            let mut meta = write_txn.open_table(META_TABLE)?;
            let existing = meta.get(SCHEMA_VERSION_KEY)?.map(|g| g.value());
            match existing {
                Some(v) => v,
                None => {
                    meta.insert(SCHEMA_VERSION_KEY, new_db_version)?;
                    new_db_version
                }
            }
        };
        create_tables(&write_txn, version)?;
        write_txn.commit()?;

        tracing::info!(schema_version = version, "Store opened");

        Ok(Self {
            db: Arc::new(db),
            schema_version: Arc::new(AtomicU64::new(version)),
            outbox_signal: Arc::new(Notify::new()),
        })
    }

    /// Migrate the schema in place to the current version
    pub fn upgrade_schema(&self) -> StorageResult<Capabilities> {
        let current = self.schema_version.load(Ordering::Acquire);
        if current >= CURRENT_SCHEMA_VERSION {
            return Ok(self.capabilities());
        }

        let txn = self.db.begin_write()?;
        create_tables(&txn, CURRENT_SCHEMA_VERSION)?;
        {
            let mut meta = txn.open_table(META_TABLE)?;
            meta.insert(SCHEMA_VERSION_KEY, CURRENT_SCHEMA_VERSION)?;
        }
        txn.commit()?;
        self.schema_version
            .store(CURRENT_SCHEMA_VERSION, Ordering::Release);

        tracing::info!(
            from = current,
            to = CURRENT_SCHEMA_VERSION,
            "Store schema upgraded"
        );
        Ok(self.capabilities())
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::for_version(self.schema_version.load(Ordering::Acquire))
    }

    fn require_printer_routing(&self) -> StorageResult<()> {
        let caps = self.capabilities();
        if caps.printer_routing {
            Ok(())
        } else {
            Err(StorageError::FeatureUnavailable {
                feature: "printer routing",
                schema_version: caps.schema_version,
            })
        }
    }

    // ========== Transactions ==========

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    /// Commit and wake the outbox dispatcher
    pub fn commit(&self, txn: WriteTransaction) -> StorageResult<()> {
        txn.commit()?;
        self.outbox_signal.notify_one();
        Ok(())
    }

    /// Signal raised after every commit
    pub fn outbox_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.outbox_signal)
    }

    // ========== ID allocation ==========

    /// Allocate the next id for `name` inside the transaction
    pub fn next_id(&self, txn: &WriteTransaction, name: &str) -> StorageResult<i64> {
        let mut table = txn.open_table(COUNTERS_TABLE)?;
        let current = table.get(name)?.map(|g| g.value()).unwrap_or(0);
        let next = current + 1;
        table.insert(name, next)?;
        Ok(next)
    }

    // ========== JSON helpers ==========

    fn put_json<T: Serialize>(
        txn: &WriteTransaction,
        def: JsonTable,
        id: i64,
        value: &T,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(def)?;
        let bytes = serde_json::to_vec(value)?;
        table.insert(id, bytes.as_slice())?;
        Ok(())
    }

    fn get_json_txn<T: DeserializeOwned>(
        txn: &WriteTransaction,
        def: JsonTable,
        id: i64,
    ) -> StorageResult<Option<T>> {
        let table = txn.open_table(def)?;
        let value = match table.get(id)? {
            Some(guard) => Some(serde_json::from_slice(guard.value())?),
            None => None,
        };
        Ok(value)
    }

    fn get_json<T: DeserializeOwned>(&self, def: JsonTable, id: i64) -> StorageResult<Option<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(def)?;
        let value = match table.get(id)? {
            Some(guard) => Some(serde_json::from_slice(guard.value())?),
            None => None,
        };
        Ok(value)
    }

    fn list_json<T: DeserializeOwned>(&self, def: JsonTable) -> StorageResult<Vec<T>> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(def) {
            Ok(t) => t,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut out = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            out.push(serde_json::from_slice(value.value())?);
        }
        Ok(out)
    }
}

fn create_tables(txn: &WriteTransaction, version: u64) -> StorageResult<()> {
    let _ = txn.open_table(DINING_TABLES_TABLE)?;
    let _ = txn.open_table(CATEGORIES_TABLE)?;
    let _ = txn.open_table(MENU_ITEMS_TABLE)?;
    let _ = txn.open_table(ORDERS_TABLE)?;
    let _ = txn.open_table(ORDERS_BY_TABLE_TABLE)?;
    let _ = txn.open_table(PAYMENTS_TABLE)?;
    let _ = txn.open_table(PAYMENT_BY_ORDER_TABLE)?;
    let _ = txn.open_table(OUTBOX_TABLE)?;
    let _ = txn.open_table(COUNTERS_TABLE)?;
    if version >= SCHEMA_V2 {
        let _ = txn.open_table(PRINTERS_TABLE)?;
    }
    Ok(())
}
