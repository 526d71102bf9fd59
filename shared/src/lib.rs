//! Shared types for the POS workspace
//!
//! Data model, order status machine, notification payloads and the unified
//! error codes used by the engine and whatever API layer sits on top of it.

pub mod error;
pub mod models;
pub mod notification;
pub mod util;

// Re-exports
pub use error::{AppError, AppResult, ErrorCategory, ErrorCode};
pub use notification::NotificationEvent;
pub use serde::{Deserialize, Serialize};
