//! Pesa payment engine
//!
//! The engine sits between a storefront, a mobile-money STK push gateway and the order ledger. It initiates push
//! payments, settles them from whichever signal arrives first (gateway callback, client polling, or the background
//! sweeper), turns completed payments into orders exactly once, and reconciles each day's completed payments against
//! the orders that were created.
//!
//! The library is divided into three main sections:
//! 1. Storage. The contracts live in [`mod@traits`] and [`SqliteDatabase`] implements all of them. The data types
//!    that cross the storage boundary are in [`db_types`].
//! 2. The public flow APIs ([`PaymentFlowApi`], [`OrderApi`] and [`ReconciliationApi`]). They are generic over their
//!    backends, so any store or gateway that implements the traits can be plugged in.
//! 3. Event hooks ([`mod@events`]). Status notifications are published through these so that a server can forward
//!    them to connected clients.
pub mod db_types;
pub mod events;
pub mod helpers;
mod pesa_api;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use pesa_api::{
    callback_queue::{CallbackQueue, DEFAULT_CALLBACK_QUEUE_SIZE},
    errors::{OrderApiError, PaymentFlowError, ReconciliationError},
    flow_config::{FlowConfig, DEFAULT_DUPLICATE_WINDOW_SECS, DEFAULT_SHIPPING_FEE, DEFAULT_STATUS_GRACE_SECS},
    order_api::{ManualOrder, ManualOrderLine, OrderApi},
    payment_flow_api::{CallbackDisposition, PaymentFlowApi, PaymentInitiation, DEFAULT_FAILURE_REASON},
    reconciliation_api::ReconciliationApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
