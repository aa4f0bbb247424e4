use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// What a gateway result code means for the payment it refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Completed,
    Failed,
    /// The code is not one we recognise. The payment stays pending until the gateway says otherwise.
    Undetermined,
}

/// The numeric `ResultCode` the gateway attaches to callbacks and status queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultCode(i64);

impl ResultCode {
    pub const SUCCESS: ResultCode = ResultCode(0);
    pub const INSUFFICIENT_FUNDS: ResultCode = ResultCode(1);
    pub const DECLINED: ResultCode = ResultCode(2);
    pub const EXPIRED: ResultCode = ResultCode(1019);
    pub const CANCELLED_BY_USER: ResultCode = ResultCode(1032);
    pub const UNREACHABLE: ResultCode = ResultCode(1037);
    pub const WRONG_PIN: ResultCode = ResultCode(2001);

    const TERMINAL_FAILURES: [ResultCode; 6] = [
        Self::INSUFFICIENT_FUNDS,
        Self::DECLINED,
        Self::EXPIRED,
        Self::CANCELLED_BY_USER,
        Self::UNREACHABLE,
        Self::WRONG_PIN,
    ];

    pub fn new(code: i64) -> Self {
        Self(code)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn outcome(&self) -> PaymentOutcome {
        if *self == Self::SUCCESS {
            PaymentOutcome::Completed
        } else if Self::TERMINAL_FAILURES.contains(self) {
            PaymentOutcome::Failed
        } else {
            PaymentOutcome::Undetermined
        }
    }

    /// A short human-readable explanation for the codes we know about.
    pub fn meaning(&self) -> Option<&'static str> {
        match self.0 {
            0 => Some("The payment was successful"),
            1 => Some("Insufficient funds"),
            2 => Some("Declined"),
            1019 => Some("The request expired before the customer responded"),
            1032 => Some("Cancelled by the customer"),
            1037 => Some("The customer's phone could not be reached"),
            2001 => Some("Wrong PIN entered"),
            _ => None,
        }
    }
}

impl From<i64> for ResultCode {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
