//! Value types shared by the Pesa checkout crates.
//!
//! * [`Amount`] is the whole-unit currency amount used for payments and orders.
//! * [`Secret`] wraps configuration values that must never appear in logs.
//! * [`validation`] holds the phone number and amount checks that run before any gateway call.
mod amount;
mod helpers;

pub mod op;
mod secret;
pub mod validation;

pub use amount::{Amount, AmountConversionError, CURRENCY_CODE};
pub use helpers::{parse_boolean_flag, parse_number};
pub use secret::Secret;
pub use validation::{normalize_phone, validate_amount, PhoneNumber, ValidationError, DEFAULT_MAX_AMOUNT};
