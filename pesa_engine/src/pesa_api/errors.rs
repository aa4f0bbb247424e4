use chrono::NaiveDate;
use pesa_common::ValidationError;
use pesa_gateway::GatewayError;
use thiserror::Error;

use crate::{
    db_types::{OrderStatusType, PaymentStatus},
    traits::StoreError,
};

#[derive(Debug, Clone, Error)]
pub enum PaymentFlowError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("Invalid payment request: {0}")]
    InvalidRequest(String),
    #[error("A matching payment request is already in progress or complete: {0}")]
    DuplicateRequest(String),
    #[error("{0}")]
    Gateway(#[from] GatewayError),
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("Payment request {0} does not exist")]
    PaymentNotFound(String),
    #[error("Payment request {id} is already {status}")]
    AlreadyTerminal { id: String, status: PaymentStatus },
    #[error("Payment request {0} belongs to someone else")]
    Forbidden(String),
    #[error("Payment request {0} has not completed")]
    NotCompleted(String),
}

#[derive(Debug, Clone, Error)]
pub enum OrderApiError {
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
    #[error("Order {id} cannot move from {from} to {to}")]
    ForbiddenTransition { id: i64, from: OrderStatusType, to: OrderStatusType },
    #[error("Invalid order: {0}")]
    InvalidOrder(String),
    #[error("{0}")]
    Store(StoreError),
}

impl From<StoreError> for OrderApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::OrderNotFound(id) => OrderApiError::OrderNotFound(id),
            StoreError::ForbiddenTransition { id, from, to } => OrderApiError::ForbiddenTransition { id, from, to },
            StoreError::InvalidOrder(msg) => OrderApiError::InvalidOrder(msg),
            e => OrderApiError::Store(e),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ReconciliationError {
    #[error("Reconciliation for {0} is already running")]
    InProgress(NaiveDate),
    #[error("{0}")]
    Store(#[from] StoreError),
}
