//! # Pesa checkout server
//! This crate hosts the HTTP server for the Pesa payment engine. It is responsible for:
//! * Starting STK push payments on behalf of authenticated payers.
//! * Receiving the gateway's result callbacks and handing them to the callback worker.
//! * Answering status polls, resolving stale payments with the gateway where needed.
//! * Running the background workers: callback processing, the pending payment sweeper and daily reconciliation.
//! * Admin routes for payments, orders and reconciliation reports.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! Public:
//! * `GET /health`
//! * `GET /payments/{correlation_id}/status`
//! * `POST /payments/callback` (gateway only, optionally IP whitelisted)
//!
//! Behind a bearer token (`/api`):
//! * `POST /payments`, `GET /payments`, `POST /payments/{correlation_id}/report-failure`, `GET /orders`
//! * `GET /admin/reconcile?date=YYYY-MM-DD`
//! * `GET /admin/payments/{correlation_id}`, `POST /admin/payments/{correlation_id}/finalize`
//! * `POST /admin/orders`, `GET /admin/orders/{id}`, `PATCH /admin/orders/{id}/status`, `DELETE /admin/orders/{id}`

pub mod auth;
pub mod callback_worker;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod middleware;
pub mod reconcile_worker;
pub mod routes;
pub mod server;
pub mod sweep_worker;
