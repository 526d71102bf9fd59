//! Order lifecycle
//!
//! Creation (pricing + table occupancy) and status transitions. Payments
//! reuse [`manager::transition_txn`] so both paths share one state machine.

mod error;
pub mod manager;

pub use error::*;
pub use manager::{CreateOrder, OrderManager, OrderMode};

#[cfg(test)]
mod tests;
