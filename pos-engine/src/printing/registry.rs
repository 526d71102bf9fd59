//! Printer registry
//!
//! Printer "connections" are configuration only: address, transport and the
//! categories a printer is responsible for. Sockets are opened per job by
//! the transport.

use crate::store::{StorageError, Store};
use parking_lot::RwLock;
use pos_printer::{NetworkPrinter, PrintResult, Printer};
use shared::models::{PrinterConfig, PrinterTransport};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Configured printer plus its last known connectivity
#[derive(Debug)]
pub struct PrinterConnection {
    pub id: i64,
    pub name: String,
    pub transport: PrinterTransport,
    pub category_ids: Vec<i64>,
    pub is_receipt_printer: bool,
    online: AtomicBool,
}

impl PrinterConnection {
    fn from_config(config: PrinterConfig) -> Self {
        Self {
            id: config.id,
            name: config.name,
            transport: config.transport,
            category_ids: config.category_ids,
            is_receipt_printer: config.is_receipt_printer,
            online: AtomicBool::new(false),
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
    }

    /// Build the network adapter for this printer, `None` for driver printers
    pub fn network_printer(&self, connect_timeout: Duration) -> Option<PrintResult<NetworkPrinter>> {
        match &self.transport {
            PrinterTransport::Network { host, port } => Some(
                NetworkPrinter::new(host, *port).map(|p| p.with_timeout(connect_timeout)),
            ),
            PrinterTransport::Driver { .. } => None,
        }
    }
}

/// Whether category routing can be used with the current database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingAvailability {
    Ready,
    /// Database schema has no printer tables
    FeatureUnavailable { schema_version: u64 },
}

#[derive(Debug)]
struct RegistryState {
    /// Active printers in routing priority order
    printers: Vec<Arc<PrinterConnection>>,
    /// category_id -> printer_id
    routes: HashMap<i64, i64>,
    availability: RoutingAvailability,
}

/// Printer registry
#[derive(Debug)]
pub struct PrinterRegistry {
    state: RwLock<RegistryState>,
}

impl Default for PrinterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PrinterRegistry {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState {
                printers: Vec::new(),
                routes: HashMap::new(),
                availability: RoutingAvailability::Ready,
            }),
        }
    }

    /// Build from configs already in priority order
    pub fn from_configs(configs: Vec<PrinterConfig>) -> Self {
        let registry = Self::new();
        registry.replace(configs);
        registry
    }

    /// Reload printer configuration from the store
    ///
    /// Called at startup and whenever printers are (re)connected. An old
    /// schema leaves the registry empty in the `FeatureUnavailable` state.
    pub fn reload(&self, store: &Store) -> Result<RoutingAvailability, StorageError> {
        match store.list_printers() {
            Ok(configs) => {
                let count = self.replace(configs);
                tracing::info!(printers = count, "Printer registry loaded");
                Ok(RoutingAvailability::Ready)
            }
            Err(StorageError::FeatureUnavailable { schema_version, .. }) => {
                let availability = RoutingAvailability::FeatureUnavailable { schema_version };
                let mut state = self.state.write();
                state.printers.clear();
                state.routes.clear();
                state.availability = availability;
                tracing::warn!(schema_version, "Printer routing unavailable for this schema");
                Ok(availability)
            }
            Err(e) => Err(e),
        }
    }

    fn replace(&self, configs: Vec<PrinterConfig>) -> usize {
        let printers: Vec<Arc<PrinterConnection>> = configs
            .into_iter()
            .filter(|c| c.is_active)
            .map(|c| Arc::new(PrinterConnection::from_config(c)))
            .collect();

        // 先到先得：同一分类只映射到第一个负责它的打印机
        let mut routes = HashMap::new();
        for printer in &printers {
            for category_id in &printer.category_ids {
                routes.entry(*category_id).or_insert(printer.id);
            }
        }

        let count = printers.len();
        let mut state = self.state.write();
        state.printers = printers;
        state.routes = routes;
        state.availability = RoutingAvailability::Ready;
        count
    }

    pub fn availability(&self) -> RoutingAvailability {
        self.state.read().availability
    }

    pub fn printers(&self) -> Vec<Arc<PrinterConnection>> {
        self.state.read().printers.clone()
    }

    pub fn get(&self, printer_id: i64) -> Option<Arc<PrinterConnection>> {
        self.state
            .read()
            .printers
            .iter()
            .find(|p| p.id == printer_id)
            .cloned()
    }

    /// Printer responsible for a category's kitchen tickets
    pub fn responsible_printer(&self, category_id: i64) -> Option<i64> {
        self.state.read().routes.get(&category_id).copied()
    }

    /// First printer flagged for customer receipts
    pub fn receipt_printer(&self) -> Option<Arc<PrinterConnection>> {
        self.state
            .read()
            .printers
            .iter()
            .find(|p| p.is_receipt_printer)
            .cloned()
    }

    /// Refresh the connectivity flag of every printer
    ///
    /// Returns the number of printers online.
    pub async fn probe_all(&self) -> usize {
        let printers = self.printers();
        let mut online = 0;
        for printer in printers {
            let reachable = match printer.network_printer(Duration::from_millis(500)) {
                Some(Ok(adapter)) => adapter.is_online().await,
                Some(Err(e)) => {
                    tracing::warn!(printer_id = printer.id, error = %e, "Invalid printer config");
                    false
                }
                None => false,
            };
            printer.set_online(reachable);
            if reachable {
                online += 1;
            }
        }
        tracing::info!(online, "Printer probe finished");
        online
    }
}
