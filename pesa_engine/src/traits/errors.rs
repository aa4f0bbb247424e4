use thiserror::Error;

use crate::db_types::OrderStatusType;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Payment request {0} already exists")]
    PaymentAlreadyExists(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
    #[error("Order {id} cannot move from {from} to {to}")]
    ForbiddenTransition { id: i64, from: OrderStatusType, to: OrderStatusType },
    #[error("Invalid order: {0}")]
    InvalidOrder(String),
    #[error("Could not decode stored data: {0}")]
    DataError(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => StoreError::DataError(e.to_string()),
            _ => StoreError::DatabaseError(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::DataError(e.to_string())
    }
}
