//! Menu Item Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Menu item entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub price: Decimal,
    /// Charged even while a buffet is running (premium drinks etc.)
    #[serde(default)]
    pub always_priced: bool,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

fn default_true() -> bool {
    true
}

impl MenuItem {
    pub fn new(id: i64, category_id: i64, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id,
            category_id,
            name: name.into(),
            price,
            always_priced: false,
            is_available: true,
        }
    }

    pub fn always_priced(mut self) -> Self {
        self.always_priced = true;
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.is_available = false;
        self
    }
}
