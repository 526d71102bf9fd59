use crate::pricing::PricingError;
use crate::store::StorageError;
use rust_decimal::Decimal;
use shared::models::OrderStatus;
use shared::{AppError, ErrorCode};
use thiserror::Error;

/// Error classes surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing input, nothing was touched
    Validation,
    /// Rejected by the current state, nothing was touched
    Conflict,
    /// Storage failure, the unit of work was rolled back
    Fatal,
}

/// Order that failed batch validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub order_id: i64,
    pub reason: String,
}

/// Errors from the order manager and payment processor
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("Table not found: {0}")]
    TableNotFound(i64),

    #[error("Order not found: {0}")]
    OrderNotFound(i64),

    #[error("Category not found: {0}")]
    CategoryNotFound(i64),

    #[error("Order {order_id}: cannot change status from {from} to {to}")]
    InvalidTransition {
        order_id: i64,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("Order already paid: {0}")]
    OrderAlreadyPaid(i64),

    #[error("Order already cancelled: {0}")]
    OrderCancelled(i64),

    #[error("Table {table_id} already runs buffet category {active_category}")]
    BuffetAlreadyActive { table_id: i64, active_category: i64 },

    #[error("Order {order_id}: amount {submitted} does not match total {expected}")]
    AmountMismatch {
        order_id: i64,
        expected: Decimal,
        submitted: Decimal,
    },

    #[error("Batch contains no orders")]
    EmptyBatch,

    #[error("Order {0} appears more than once in the batch")]
    DuplicateOrderInBatch(i64),

    #[error("Batch rejected: {} order(s) failed validation", .0.len())]
    BatchRejected(Vec<BatchFailure>),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ManagerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ManagerError::Storage(StorageError::FeatureUnavailable { .. }) => ErrorKind::Conflict,
            ManagerError::Storage(_) => ErrorKind::Fatal,
            ManagerError::Pricing(_)
            | ManagerError::TableNotFound(_)
            | ManagerError::OrderNotFound(_)
            | ManagerError::CategoryNotFound(_)
            | ManagerError::EmptyBatch
            | ManagerError::DuplicateOrderInBatch(_)
            | ManagerError::AmountMismatch { .. }
            | ManagerError::InvalidInput(_) => ErrorKind::Validation,
            ManagerError::InvalidTransition { .. }
            | ManagerError::OrderAlreadyPaid(_)
            | ManagerError::OrderCancelled(_)
            | ManagerError::BuffetAlreadyActive { .. }
            | ManagerError::BatchRejected(_) => ErrorKind::Conflict,
        }
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;

fn pricing_code(e: &PricingError) -> ErrorCode {
    match e {
        PricingError::MenuItemNotFound(_) => ErrorCode::MenuItemNotFound,
        PricingError::MenuItemUnavailable(_) => ErrorCode::MenuItemUnavailable,
        PricingError::CategoryNotBuffet(_) | PricingError::MissingBuffetPrice(_) => {
            ErrorCode::CategoryNotBuffet
        }
        PricingError::InvalidQuantity { .. } | PricingError::InvalidPartySize => {
            ErrorCode::ValueOutOfRange
        }
        PricingError::NegativeAdjustment { .. } => ErrorCode::ValidationFailed,
    }
}

impl From<ManagerError> for AppError {
    fn from(err: ManagerError) -> Self {
        let message = err.to_string();
        match err {
            ManagerError::Storage(StorageError::FeatureUnavailable { .. }) => {
                AppError::with_message(ErrorCode::FeatureUnavailable, message)
            }
            ManagerError::Storage(e) => {
                // 保留技术细节用于日志
                tracing::error!(error = %e, "Storage error occurred");
                AppError::with_message(ErrorCode::DatabaseError, message)
            }
            ManagerError::Pricing(e) => AppError::with_message(pricing_code(&e), message),
            ManagerError::TableNotFound(id) => {
                AppError::with_message(ErrorCode::TableNotFound, message).with_detail("table_id", id)
            }
            ManagerError::OrderNotFound(id) => {
                AppError::with_message(ErrorCode::OrderNotFound, message).with_detail("order_id", id)
            }
            ManagerError::CategoryNotFound(id) => {
                AppError::with_message(ErrorCode::CategoryNotFound, message)
                    .with_detail("category_id", id)
            }
            ManagerError::InvalidTransition { order_id, from, to } => {
                AppError::with_message(ErrorCode::InvalidStatusTransition, message)
                    .with_detail("order_id", order_id)
                    .with_detail("from", from.as_str())
                    .with_detail("to", to.as_str())
            }
            ManagerError::OrderAlreadyPaid(id) => {
                AppError::with_message(ErrorCode::OrderAlreadyPaid, message)
                    .with_detail("order_id", id)
            }
            ManagerError::OrderCancelled(id) => {
                AppError::with_message(ErrorCode::OrderAlreadyCancelled, message)
                    .with_detail("order_id", id)
            }
            ManagerError::BuffetAlreadyActive {
                table_id,
                active_category,
            } => AppError::with_message(ErrorCode::BuffetAlreadyActive, message)
                .with_detail("table_id", table_id)
                .with_detail("active_category", active_category),
            ManagerError::AmountMismatch {
                order_id,
                expected,
                submitted,
            } => AppError::with_message(ErrorCode::PaymentAmountMismatch, message)
                .with_detail("order_id", order_id)
                .with_detail("expected", expected.to_string())
                .with_detail("submitted", submitted.to_string()),
            ManagerError::EmptyBatch | ManagerError::DuplicateOrderInBatch(_) => {
                AppError::validation(message)
            }
            ManagerError::BatchRejected(failures) => {
                let errors: Vec<serde_json::Value> = failures
                    .iter()
                    .map(|f| serde_json::json!({ "order_id": f.order_id, "reason": f.reason }))
                    .collect();
                AppError::with_message(ErrorCode::PaymentBatchRejected, message)
                    .with_detail("errors", errors)
            }
            ManagerError::InvalidInput(_) => AppError::with_message(ErrorCode::InvalidRequest, message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(ManagerError::TableNotFound(1).kind(), ErrorKind::Validation);
        assert_eq!(
            ManagerError::Pricing(PricingError::MenuItemUnavailable(3)).kind(),
            ErrorKind::Validation
        );
        assert_eq!(ManagerError::OrderAlreadyPaid(1).kind(), ErrorKind::Conflict);
        assert_eq!(
            ManagerError::InvalidTransition {
                order_id: 1,
                from: OrderStatus::Pending,
                to: OrderStatus::Paid,
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            ManagerError::Storage(StorageError::Serialization(
                serde_json::from_str::<i64>("x").unwrap_err()
            ))
            .kind(),
            ErrorKind::Fatal
        );
    }

    #[test]
    fn test_app_error_codes() {
        let err: AppError = ManagerError::InvalidTransition {
            order_id: 9,
            from: OrderStatus::Pending,
            to: OrderStatus::Paid,
        }
        .into();
        assert_eq!(err.code, ErrorCode::InvalidStatusTransition);
        let details = err.details.unwrap();
        assert_eq!(details["order_id"], 9);
        assert_eq!(details["to"], "PAID");

        let err: AppError = ManagerError::Pricing(PricingError::MenuItemNotFound(4)).into();
        assert_eq!(err.code, ErrorCode::MenuItemNotFound);

        let err: AppError = ManagerError::BatchRejected(vec![BatchFailure {
            order_id: 2,
            reason: "already paid".to_string(),
        }])
        .into();
        assert_eq!(err.code, ErrorCode::PaymentBatchRejected);
        assert_eq!(err.details.unwrap()["errors"][0]["order_id"], 2);
    }
}
