//! Input checks that run before anything is sent to the payment gateway.
//!
//! Phone numbers are accepted in the forms customers actually type (`0712345678`, `+254712345678`,
//! `254712345678` or `712345678`) and converted to the canonical country-code prefixed form the gateway
//! expects. Amounts are whole currency units in `[1, max]`.
use std::fmt::Display;

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::Amount;

pub const COUNTRY_CODE: &str = "254";
/// Number of digits in a national subscriber number, after the country code or trunk prefix.
pub const NATIONAL_NUMBER_LENGTH: usize = 9;
pub const DEFAULT_MAX_AMOUNT: i64 = 150_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid phone number: {0}")]
    InvalidPhone(String),
    #[error("Invalid amount: {amount}. Amounts must be between 1 and {max}")]
    InvalidAmount { amount: i64, max: i64 },
}

/// A phone number in canonical `254XXXXXXXXX` form. The only way to construct one outside of storage is via
/// [`normalize_phone`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

pub fn normalize_phone(raw: &str) -> Result<PhoneNumber, ValidationError> {
    let trimmed = raw.trim();
    let national = if let Some(rest) = trimmed.strip_prefix('+') {
        rest.strip_prefix(COUNTRY_CODE)
    } else if trimmed.len() == COUNTRY_CODE.len() + NATIONAL_NUMBER_LENGTH {
        trimmed.strip_prefix(COUNTRY_CODE)
    } else if trimmed.len() == NATIONAL_NUMBER_LENGTH + 1 {
        trimmed.strip_prefix('0')
    } else {
        Some(trimmed)
    };
    match national {
        Some(n) if n.len() == NATIONAL_NUMBER_LENGTH && n.chars().all(|c| c.is_ascii_digit()) => {
            Ok(PhoneNumber(format!("{COUNTRY_CODE}{n}")))
        },
        _ => Err(ValidationError::InvalidPhone(raw.to_string())),
    }
}

pub fn validate_amount(amount: i64, max: i64) -> Result<Amount, ValidationError> {
    if (1..=max).contains(&amount) {
        Ok(Amount::from(amount))
    } else {
        Err(ValidationError::InvalidAmount { amount, max })
    }
}
