//! Payments
//!
//! Single and batch settlement. Every payment moves its order to PAID
//! through the same state machine as [`crate::orders`].

pub mod processor;

pub use processor::{BatchOutcome, BatchPayment, PaymentProcessor, PaymentRequest, ReceiptMode};
