//! Client for the mobile-money STK push gateway.
//!
//! [`GatewayApi`] initiates push payments and queries their status, caching the gateway's bearer credential in
//! between. Consumers should depend on the [`PushPaymentProvider`] trait rather than the concrete client so that
//! the gateway can be swapped out in tests. [`parse_callback`] validates the webhook the gateway sends once the
//! customer has responded to the prompt.
mod api;
mod callback;
mod config;
mod credentials;
mod data_objects;
mod error;
pub mod helpers;
mod provider;
mod result_code;

pub use api::GatewayApi;
pub use callback::{parse_callback, CallbackPayload};
pub use config::{GatewayConfig, DEFAULT_GATEWAY_URL, DEFAULT_TIMEOUT};
pub use credentials::{AccessToken, CredentialCache};
pub use data_objects::{GatewayResult, PushAccepted, PushRequest, QueryOutcome};
pub use error::GatewayError;
pub use provider::PushPaymentProvider;
pub use result_code::{PaymentOutcome, ResultCode};
