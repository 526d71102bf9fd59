//! Printer Model

use serde::{Deserialize, Serialize};

/// Physical connection method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "connection", rename_all = "snake_case")]
pub enum PrinterTransport {
    /// Raw TCP (port 9100 on most thermal printers)
    Network { host: String, port: u16 },
    /// OS printer driver by name
    Driver { driver_name: String },
}

/// Persisted printer configuration
///
/// `category_ids` lists the menu categories whose kitchen tickets this
/// printer is responsible for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterConfig {
    pub id: i64,
    pub name: String,
    #[serde(flatten)]
    pub transport: PrinterTransport,
    #[serde(default)]
    pub category_ids: Vec<i64>,
    /// Receives customer receipts
    #[serde(default)]
    pub is_receipt_printer: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i32,
}

fn default_true() -> bool {
    true
}
