//! Pricing engine
//!
//! Pure computation over already-loaded catalog data. No I/O: the order
//! manager loads menu items and the buffet category inside its write
//! transaction and hands them in here.

mod engine;

pub use engine::*;

use rust_decimal::prelude::*;
use shared::models::OrderItem;
use thiserror::Error;

/// Rounding for monetary values (2 decimal places, half away from zero)
const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Maximum allowed quantity per line
pub const MAX_QUANTITY: u32 = 9999;

/// Round a monetary value to cents
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// `|a - b| <= 0.01`
#[inline]
pub fn money_eq(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() <= MONEY_TOLERANCE
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    #[error("Menu item not found: {0}")]
    MenuItemNotFound(i64),

    #[error("Menu item unavailable: {0}")]
    MenuItemUnavailable(i64),

    #[error("Category {0} is not a buffet category")]
    CategoryNotBuffet(i64),

    #[error("Buffet category {0} has no price")]
    MissingBuffetPrice(i64),

    #[error("Invalid quantity {quantity} for menu item {menu_item_id}")]
    InvalidQuantity { menu_item_id: i64, quantity: u32 },

    #[error("Party size must be at least 1")]
    InvalidPartySize,

    #[error("{field} must be non-negative, got {value}")]
    NegativeAdjustment { field: &'static str, value: Decimal },
}

/// Submitted order line
#[derive(Debug, Clone, PartialEq)]
pub struct LineInput {
    pub menu_item_id: i64,
    pub quantity: u32,
    pub note: Option<String>,
}

impl LineInput {
    pub fn new(menu_item_id: i64, quantity: u32) -> Self {
        Self {
            menu_item_id,
            quantity,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Order-level adjustments applied after the subtotal
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Adjustments {
    pub discount: Decimal,
    pub service_charge: Decimal,
    pub tip: Decimal,
}

/// Priced line with its snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub menu_item_id: i64,
    pub category_id: i64,
    pub name: String,
    pub quantity: u32,
    /// Zero when included in a buffet
    pub unit_price: Decimal,
    pub included_in_buffet: bool,
    pub note: Option<String>,
}

impl PricedLine {
    pub fn line_total(&self) -> Decimal {
        round_money(self.unit_price * Decimal::from(self.quantity))
    }

    pub fn into_order_item(self, order_id: i64) -> OrderItem {
        OrderItem {
            order_id,
            menu_item_id: self.menu_item_id,
            category_id: self.category_id,
            name: self.name,
            quantity: self.quantity,
            unit_price: self.unit_price,
            included_in_buffet: self.included_in_buffet,
            note: self.note,
        }
    }
}

/// Result of pricing an order
///
/// `total == subtotal + tax - discount + service_charge + tip` holds exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedOrder {
    pub lines: Vec<PricedLine>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    /// Discount actually applied (capped at the gross amount)
    pub discount: Decimal,
    pub service_charge: Decimal,
    pub tip: Decimal,
    pub total: Decimal,
}
