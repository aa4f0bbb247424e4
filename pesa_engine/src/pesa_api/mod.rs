//! # Pesa engine public API
//!
//! * [`payment_flow_api`] initiates push payments and settles them from callbacks, client polling, the pending sweeper
//!   and customer-reported failures. Completed payments are turned into orders by its finalizer.
//! * [`order_api`] is admin order management: manual orders, status transitions and deletion.
//! * [`reconciliation_api`] matches each day's completed payments against orders and stores the report.
//! * [`callback_queue`] hands gateway callbacks from the HTTP receiver to the callback worker.
//!
//! Each API is created from a backend that implements the storage traits it needs, e.g.
//!
//! ```rust,ignore
//! let db = SqliteDatabase::new_with_url(url, 25).await?;
//! let api = ReconciliationApi::new(db);
//! let report = api.reconcile(date).await?;
//! ```
pub mod callback_queue;
pub mod errors;
pub mod flow_config;
pub mod order_api;
pub mod payment_flow_api;
pub mod reconciliation_api;
