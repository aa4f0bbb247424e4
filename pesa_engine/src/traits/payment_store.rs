use chrono::{DateTime, Utc};

use crate::{
    db_types::{Amount, NewPaymentRequest, PaymentRequest, PaymentSettlement, PhoneNumber},
    traits::StoreError,
};

/// The durable record of every payment attempt.
///
/// Payment requests are created `Pending` and move exactly once to `Completed` or `Failed`. They are never deleted.
#[allow(async_fn_in_trait)]
pub trait PaymentStore: Clone {
    /// Stores a new pending payment request. Fails with [`StoreError::PaymentAlreadyExists`] if the id is taken.
    async fn insert_payment_request(&self, request: NewPaymentRequest) -> Result<PaymentRequest, StoreError>;

    async fn fetch_payment_request(&self, id: &str) -> Result<Option<PaymentRequest>, StoreError>;

    /// Returns the most recent payment request by `payer_id` for the same phone and amount created at or after
    /// `since`, whatever its status.
    async fn find_recent_duplicate(
        &self,
        payer_id: &str,
        phone: &PhoneNumber,
        amount: Amount,
        since: DateTime<Utc>,
    ) -> Result<Option<PaymentRequest>, StoreError>;

    /// Atomically moves the payment from `Pending` to the terminal status in `settlement`.
    ///
    /// Returns the updated record, or `None` if the payment does not exist or is no longer pending. Of two racing
    /// callers, exactly one gets `Some`.
    async fn settle_payment(
        &self,
        id: &str,
        settlement: PaymentSettlement,
    ) -> Result<Option<PaymentRequest>, StoreError>;

    /// All payment requests made by `payer_id`, newest first.
    async fn payments_for_payer(&self, payer_id: &str) -> Result<Vec<PaymentRequest>, StoreError>;

    /// Completed payments created in `[start, end)`, oldest first.
    async fn completed_payments_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PaymentRequest>, StoreError>;

    /// Payments that are still pending and were created before `cutoff`, oldest first.
    async fn pending_payments_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<PaymentRequest>, StoreError>;
}
