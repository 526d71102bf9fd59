//! Print job types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{Order, PaymentMethod};
use shared::notification::PrintJobKind;
use std::time::Duration;
use uuid::Uuid;

/// Queue tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintQueueConfig {
    /// Attempts per job before it is given up
    pub max_retries: u32,
    /// First backoff delay, doubled per failed attempt
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
    /// Pause between consecutive jobs
    pub inter_job_delay: Duration,
    /// Deadline for a single send
    pub job_timeout: Duration,
}

impl Default for PrintQueueConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(30),
            inter_job_delay: Duration::from_millis(200),
            job_timeout: Duration::from_secs(10),
        }
    }
}

impl PrintQueueConfig {
    /// Delay before the next attempt after `failures` failed attempts
    pub fn backoff(&self, failures: u32) -> Duration {
        let exp = failures.saturating_sub(1).min(16);
        self.retry_base_delay
            .saturating_mul(1 << exp)
            .min(self.retry_max_delay)
    }
}

/// 厨房单菜品（不含价格）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketItem {
    pub menu_item_id: i64,
    pub category_id: i64,
    pub name: String,
    pub quantity: u32,
    pub note: Option<String>,
}

/// Kitchen ticket for one printer station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KitchenTicket {
    pub order_id: i64,
    pub table_name: String,
    pub printer_id: i64,
    pub items: Vec<TicketItem>,
    pub created_at: i64,
    #[serde(default)]
    pub reprint: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    #[serde(default)]
    pub included_in_buffet: bool,
}

/// Customer receipt covering one or more paid orders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptData {
    pub order_ids: Vec<i64>,
    pub payment_ids: Vec<i64>,
    pub table_name: String,
    pub lines: Vec<ReceiptLine>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub service_charge: Decimal,
    pub tip: Decimal,
    pub total: Decimal,
    pub method: PaymentMethod,
    pub paid_at: i64,
    #[serde(default)]
    pub reprint: bool,
}

impl ReceiptData {
    /// Build a receipt from paid orders and their payment ids
    ///
    /// Buffet orders get a synthetic line for the per-person charge, which
    /// is the part of the subtotal not covered by item lines.
    pub fn from_orders(
        orders: &[Order],
        payment_ids: Vec<i64>,
        table_name: impl Into<String>,
        method: PaymentMethod,
        paid_at: i64,
    ) -> Self {
        let mut lines = Vec::new();
        let mut subtotal = Decimal::ZERO;
        let mut tax = Decimal::ZERO;
        let mut discount = Decimal::ZERO;
        let mut service_charge = Decimal::ZERO;
        let mut tip = Decimal::ZERO;
        let mut total = Decimal::ZERO;

        for order in orders {
            let items_total: Decimal = order.items.iter().map(|i| i.line_total()).sum();
            let buffet_charge = order.subtotal - items_total;
            if order.is_buffet && buffet_charge > Decimal::ZERO {
                let guests = order.party_size.unwrap_or(1).max(1);
                lines.push(ReceiptLine {
                    name: "Buffet".to_string(),
                    quantity: guests,
                    unit_price: crate::pricing::round_money(buffet_charge / Decimal::from(guests)),
                    line_total: buffet_charge,
                    included_in_buffet: false,
                });
            }
            for item in &order.items {
                lines.push(ReceiptLine {
                    name: item.name.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    line_total: item.line_total(),
                    included_in_buffet: item.included_in_buffet,
                });
            }

            subtotal += order.subtotal;
            tax += order.tax;
            discount += order.discount;
            service_charge += order.service_charge;
            tip += order.tip;
            total += order.total;
        }

        Self {
            order_ids: orders.iter().map(|o| o.id).collect(),
            payment_ids,
            table_name: table_name.into(),
            lines,
            subtotal,
            tax,
            discount,
            service_charge,
            tip,
            total,
            method,
            paid_at,
            reprint: false,
        }
    }
}

/// Unit of work carried by a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PrintPayload {
    KitchenTicket(KitchenTicket),
    CustomerReceipt(ReceiptData),
    /// Connectivity check for one printer, no order context
    Test { printer_id: i64 },
}

/// In-memory print job
#[derive(Debug, Clone, PartialEq)]
pub struct PrintJob {
    pub id: Uuid,
    /// Failed attempts so far
    pub retries: u32,
    pub max_retries: u32,
    pub payload: PrintPayload,
}

impl PrintJob {
    pub fn new(payload: PrintPayload, max_retries: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            retries: 0,
            max_retries,
            payload,
        }
    }

    pub fn kind(&self) -> PrintJobKind {
        match &self.payload {
            PrintPayload::KitchenTicket(_) => PrintJobKind::KitchenTicket,
            PrintPayload::CustomerReceipt(_) => PrintJobKind::CustomerReceipt,
            PrintPayload::Test { .. } => PrintJobKind::Test,
        }
    }

    /// Related order; the first one for a merged receipt
    pub fn order_id(&self) -> Option<i64> {
        match &self.payload {
            PrintPayload::KitchenTicket(t) => Some(t.order_id),
            PrintPayload::CustomerReceipt(r) => r.order_ids.first().copied(),
            PrintPayload::Test { .. } => None,
        }
    }

    pub fn payment_ids(&self) -> &[i64] {
        match &self.payload {
            PrintPayload::CustomerReceipt(r) => &r.payment_ids,
            _ => &[],
        }
    }
}
