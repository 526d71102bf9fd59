//! Category Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Menu category
///
/// A buffet category carries the per-person price charged when a buffet
/// order is opened against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub is_buffet: bool,
    pub buffet_price: Option<Decimal>,
    #[serde(default)]
    pub sort_order: i32,
}

impl Category {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_buffet: false,
            buffet_price: None,
            sort_order: 0,
        }
    }

    pub fn buffet(id: i64, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            is_buffet: true,
            buffet_price: Some(price),
            ..Self::new(id, name)
        }
    }

    /// Per-person price, only when this is a properly configured buffet category
    pub fn buffet_price(&self) -> Option<Decimal> {
        if self.is_buffet { self.buffet_price } else { None }
    }
}
