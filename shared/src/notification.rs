//! Notification payloads
//!
//! Events the engine emits for subscribed viewers. Delivery is best-effort;
//! nothing in the engine waits on it.

use crate::models::{DiningTable, Order, Payment};
use serde::{Deserialize, Serialize};

/// Print job kind, as reported in printer errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrintJobKind {
    KitchenTicket,
    CustomerReceipt,
    Test,
}

impl PrintJobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KitchenTicket => "kitchen_ticket",
            Self::CustomerReceipt => "customer_receipt",
            Self::Test => "test",
        }
    }
}

impl std::fmt::Display for PrintJobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum NotificationEvent {
    OrderCreated(Order),
    OrderUpdated(Order),
    OrderCancelled {
        order_id: i64,
        table_id: i64,
    },
    TableUpdated(DiningTable),
    PaymentCompleted(Payment),
    PrinterError {
        message: String,
        job_kind: PrintJobKind,
        order_id: Option<i64>,
    },
}

impl NotificationEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OrderCreated(_) => "order_created",
            Self::OrderUpdated(_) => "order_updated",
            Self::OrderCancelled { .. } => "order_cancelled",
            Self::TableUpdated(_) => "table_updated",
            Self::PaymentCompleted(_) => "payment_completed",
            Self::PrinterError { .. } => "printer_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printer_error_serialization() {
        let event = NotificationEvent::PrinterError {
            message: "Printer offline".to_string(),
            job_kind: PrintJobKind::CustomerReceipt,
            order_id: Some(7),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "printer_error");
        assert_eq!(json["data"]["job_kind"], "customer_receipt");
        assert_eq!(json["data"]["order_id"], 7);
        assert_eq!(event.name(), "printer_error");
    }
}
