use chrono::Duration;
use pesa_common::{Amount, DEFAULT_MAX_AMOUNT};

use crate::helpers::RetryPolicy;

pub const DEFAULT_SHIPPING_FEE: i64 = 200;
pub const DEFAULT_DUPLICATE_WINDOW_SECS: i64 = 300;
pub const DEFAULT_STATUS_GRACE_SECS: i64 = 5;

/// Tunables for [`super::PaymentFlowApi`].
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// The largest amount a single push may request
    pub max_amount: i64,
    /// Identical requests inside this window are treated as duplicates
    pub duplicate_window: Duration,
    /// Pending payments younger than this are reported as pending without asking the gateway
    pub status_grace: Duration,
    pub shipping_fee: Amount,
    /// Applied to the finalizer's side effects
    pub retry: RetryPolicy,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            max_amount: DEFAULT_MAX_AMOUNT,
            duplicate_window: Duration::seconds(DEFAULT_DUPLICATE_WINDOW_SECS),
            status_grace: Duration::seconds(DEFAULT_STATUS_GRACE_SECS),
            shipping_fee: Amount::from(DEFAULT_SHIPPING_FEE),
            retry: RetryPolicy::default(),
        }
    }
}
