//! Order Model
//!
//! Orders are written once with their items; afterwards only `status`
//! (and `updated_at`) may change.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order status
///
/// ```text
/// PENDING    → PREPARING | CANCELLED
/// PREPARING  → PAID | CANCELLED
/// READY      → PAID | CANCELLED      (legacy)
/// SERVED     → PAID                  (legacy)
/// PAID       → (terminal)
/// CANCELLED  → (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Preparing,
    /// Legacy status, only present in older data
    Ready,
    /// Legacy status, only present in older data
    Served,
    Paid,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled)
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Preparing)
                | (Pending, Cancelled)
                | (Preparing, Paid)
                | (Preparing, Cancelled)
                | (Ready, Paid)
                | (Ready, Cancelled)
                | (Served, Paid)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Preparing => "PREPARING",
            Self::Ready => "READY",
            Self::Served => "SERVED",
            Self::Paid => "PAID",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_id: i64,
    pub menu_item_id: i64,
    /// Category at order time (kitchen routing key)
    pub category_id: i64,
    /// Menu item name at order time
    pub name: String,
    pub quantity: u32,
    /// Unit price snapshot, zero when included in a buffet
    pub unit_price: Decimal,
    #[serde(default)]
    pub included_in_buffet: bool,
    pub note: Option<String>,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Order entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub table_id: i64,
    pub status: OrderStatus,
    #[serde(default)]
    pub is_buffet: bool,
    pub buffet_category_id: Option<i64>,
    pub party_size: Option<u32>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub service_charge: Decimal,
    pub tip: Decimal,
    pub total: Decimal,
    pub items: Vec<OrderItem>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    /// `subtotal + tax - discount + service_charge + tip`
    pub fn computed_total(&self) -> Decimal {
        self.subtotal + self.tax - self.discount + self.service_charge + self.tip
    }

    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Active buffet orders drive buffet pricing for the whole table
    pub fn is_active_buffet(&self) -> bool {
        self.is_active() && self.is_buffet
    }
}
