//! # Storage and collaborator contracts
//!
//! The flow APIs in this crate are generic over their backends. A backend needs to implement:
//!
//! * [`PaymentStore`]: the durable record of every payment attempt. It is the single source of truth for payment status
//!   and must support an atomic compare-and-set from `Pending` to a terminal status.
//! * [`OrderStore`]: orders, their line items, carts and inventory counters. Inserting an order for a payment must be
//!   idempotent on the payment reference.
//! * [`ReportStore`]: persisted reconciliation reports.
//! * [`NotificationChannel`]: best-effort, fire-and-forget delivery of status updates to connected clients.
//!
//! [`crate::SqliteDatabase`] implements the three storage traits. [`crate::events::EventNotifier`] implements the
//! notification channel on top of the engine's event hooks.
mod errors;
mod notification;
mod order_store;
mod payment_store;
mod report_store;

pub use errors::StoreError;
pub use notification::{NotificationChannel, NotificationError};
pub use order_store::{InsertOrderResult, OrderStore};
pub use payment_store::PaymentStore;
pub use report_store::ReportStore;
