use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;
use pesa_common::{normalize_phone, validate_amount, Amount, PhoneNumber};
use pesa_gateway::{CallbackPayload, GatewayResult, PaymentOutcome, PushPaymentProvider, PushRequest, QueryOutcome};
use serde::{Deserialize, Serialize};

use super::{errors::PaymentFlowError, flow_config::FlowConfig};
use crate::{
    db_types::{NewOrder, NewPaymentRequest, Notification, PaymentRequest, PaymentSettlement, PaymentStatus},
    helpers::{with_backoff, KeyedLocks},
    traits::{InsertOrderResult, NotificationChannel, OrderStore, PaymentStore},
};

pub const DEFAULT_FAILURE_REASON: &str = "Payment abandoned by customer";

/// Payer, canonical phone and amount. Two initiations with the same key are duplicates.
type DuplicateKey = (String, String, Amount);

/// What the storefront sends to start a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInitiation {
    pub phone: String,
    pub amount: i64,
    pub order_ref: String,
    pub description: Option<String>,
}

/// How a gateway callback was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackDisposition {
    /// The callback moved the payment to a terminal status.
    Settled(PaymentRequest),
    /// The payment had already reached a terminal status. Nothing changed.
    AlreadyTerminal(PaymentStatus),
    /// The result code is not one we can classify. The payment stays pending.
    Undetermined(i64),
    /// No payment with the callback's correlation id exists.
    UnknownPayment,
}

/// `PaymentFlowApi` drives a payment from the initial push through to the order that is created once it completes.
///
/// Every path that can settle a payment (gateway callbacks, client polling, the pending sweeper and customer-reported
/// failures) goes through the store's compare-and-set, so a payment is settled exactly once no matter how many of
/// these race. The finalizer is idempotent on the payment reference, so a completed payment yields at most one order.
pub struct PaymentFlowApi<B, G, N> {
    db: B,
    gateway: G,
    notifier: N,
    config: FlowConfig,
    initiating: KeyedLocks<DuplicateKey>,
}

impl<B, G, N> Debug for PaymentFlowApi<B, G, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi ({:?})", self.config)
    }
}

impl<B, G, N> PaymentFlowApi<B, G, N> {
    pub fn new(db: B, gateway: G, notifier: N, config: FlowConfig) -> Self {
        Self { db, gateway, notifier, config, initiating: KeyedLocks::default() }
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }
}

impl<B, G, N> PaymentFlowApi<B, G, N>
where
    B: PaymentStore + OrderStore,
    G: PushPaymentProvider,
    N: NotificationChannel,
{
    /// Validates the request, applies the duplicate guard, pushes the payment prompt and records the pending payment.
    ///
    /// Nothing is sent to the gateway if validation fails or a matching pending or completed request exists within the
    /// duplicate window. A matching *failed* request does not block a retry.
    ///
    /// Initiations with the same payer, phone and amount are serialized from the duplicate check until the pending
    /// payment is stored, so a second request that arrives while the first push is in flight sees the first payment
    /// and is rejected as a duplicate.
    pub async fn initiate_payment(
        &self,
        payer_id: &str,
        request: PaymentInitiation,
    ) -> Result<PaymentRequest, PaymentFlowError> {
        let phone = normalize_phone(&request.phone)?;
        let amount = validate_amount(request.amount, self.config.max_amount)?;
        let order_ref = request.order_ref.trim().to_string();
        if order_ref.is_empty() {
            return Err(PaymentFlowError::InvalidRequest("orderRef is required".into()));
        }
        let key = (payer_id.to_string(), phone.as_str().to_string(), amount);
        if self.initiating.is_locked(&key) {
            debug!("🔄️💸️ A payment of {amount} from {payer_id} is already being pushed. Waiting for it.");
        }
        let _in_flight = self.initiating.lock(key).await;
        if let Some(existing) = self.check_duplicate(payer_id, &phone, amount).await? {
            match existing.status {
                PaymentStatus::Pending | PaymentStatus::Completed => {
                    info!(
                        "🔄️💸️ Duplicate payment request from {payer_id} for {amount}. [{}] is already {}.",
                        existing.id, existing.status
                    );
                    return Err(PaymentFlowError::DuplicateRequest(existing.id));
                },
                PaymentStatus::Failed => {
                    debug!("🔄️💸️ [{}] failed recently. Allowing {payer_id} to retry.", existing.id);
                },
            }
        }
        let description = request
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| format!("Payment for {order_ref}"));
        let push = PushRequest {
            phone: phone.clone(),
            amount,
            account_reference: order_ref.clone(),
            description: description.clone(),
        };
        let accepted = self.gateway.initiate_push(push).await.map_err(|e| {
            warn!("🔄️💸️ Gateway did not accept the push for {payer_id} ({order_ref}). {e}");
            e
        })?;
        let new_request = NewPaymentRequest {
            id: accepted.correlation_id,
            merchant_request_id: Some(accepted.merchant_request_id).filter(|s| !s.is_empty()),
            order_ref,
            payer_id: payer_id.to_string(),
            phone,
            amount,
            description: Some(description),
            created_at: Utc::now(),
        };
        let payment = self.db.insert_payment_request(new_request).await?;
        info!("🔄️💸️ Payment [{}] of {} pushed to {} for {}", payment.id, payment.amount, payment.phone, payer_id);
        Ok(payment)
    }

    /// The most recent request with the same payer, phone and amount inside the duplicate window, whatever its status.
    pub async fn check_duplicate(
        &self,
        payer_id: &str,
        phone: &PhoneNumber,
        amount: Amount,
    ) -> Result<Option<PaymentRequest>, PaymentFlowError> {
        let since = Utc::now() - self.config.duplicate_window;
        let existing = self.db.find_recent_duplicate(payer_id, phone, amount, since).await?;
        Ok(existing)
    }

    pub async fn fetch_payment(&self, id: &str) -> Result<Option<PaymentRequest>, PaymentFlowError> {
        Ok(self.db.fetch_payment_request(id).await?)
    }

    pub async fn payments_for_payer(&self, payer_id: &str) -> Result<Vec<PaymentRequest>, PaymentFlowError> {
        Ok(self.db.payments_for_payer(payer_id).await?)
    }

    /// The current status of a payment, asking the gateway if it has been pending for longer than the grace period.
    ///
    /// Gateway errors never fail the call. The payment is reported as pending and the caller can poll again.
    pub async fn payment_status(&self, id: &str) -> Result<PaymentRequest, PaymentFlowError> {
        let payment = self.require_payment(id).await?;
        if payment.is_terminal() {
            return Ok(payment);
        }
        if Utc::now() - payment.created_at < self.config.status_grace {
            trace!("🔄️🔍️ [{id}] is still inside the grace period. Not asking the gateway yet.");
            return Ok(payment);
        }
        self.resolve_pending(payment).await
    }

    /// Actively queries the gateway for every payment that has been pending for longer than `stale_after`.
    /// Returns the number of payments that were settled.
    pub async fn resolve_stale_payments(&self, stale_after: Duration) -> Result<usize, PaymentFlowError> {
        let cutoff = Utc::now() - stale_after;
        let stale = self.db.pending_payments_older_than(cutoff).await?;
        if stale.is_empty() {
            return Ok(0);
        }
        debug!("🔄️🧹️ {} payments have been pending since before {cutoff}", stale.len());
        let mut settled = 0;
        for payment in stale {
            let resolved = self.resolve_pending(payment).await?;
            if resolved.is_terminal() {
                settled += 1;
            }
        }
        Ok(settled)
    }

    /// Marks a pending payment as failed at the customer's request.
    ///
    /// Only the payer who owns the payment, or an admin, may do this.
    pub async fn report_failure(
        &self,
        id: &str,
        requester: &str,
        is_admin: bool,
        reason: Option<String>,
    ) -> Result<PaymentRequest, PaymentFlowError> {
        let payment = self.require_payment(id).await?;
        if !is_admin && payment.payer_id != requester {
            warn!("🔄️❌️ {requester} tried to fail payment [{id}], which belongs to {}", payment.payer_id);
            return Err(PaymentFlowError::Forbidden(id.to_string()));
        }
        if payment.is_terminal() {
            return Err(PaymentFlowError::AlreadyTerminal { id: payment.id, status: payment.status });
        }
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_FAILURE_REASON.to_string());
        match self.db.settle_payment(id, PaymentSettlement::failed(None, reason)).await? {
            Some(failed) => {
                info!("🔄️❌️ Payment [{id}] marked as failed by {requester}");
                self.notify(&failed.payer_id, Notification::payment_settled(&failed)).await;
                Ok(failed)
            },
            None => {
                let current = self.require_payment(id).await?;
                Err(PaymentFlowError::AlreadyTerminal { id: current.id, status: current.status })
            },
        }
    }

    /// Applies a validated gateway callback. Processing is idempotent: repeated callbacks for a payment that has
    /// already settled change nothing.
    pub async fn process_callback(&self, payload: CallbackPayload) -> Result<CallbackDisposition, PaymentFlowError> {
        let id = payload.correlation_id.as_str();
        let Some(payment) = self.db.fetch_payment_request(id).await? else {
            warn!("🔄️📥️ Received a callback for unknown payment [{id}]. Dropping it.");
            return Ok(CallbackDisposition::UnknownPayment);
        };
        if payment.is_terminal() {
            debug!("🔄️📥️ Payment [{id}] is already {}. Ignoring the repeated callback.", payment.status);
            return Ok(CallbackDisposition::AlreadyTerminal(payment.status));
        }
        let mismatch = payload.amount.filter(|paid| *paid != payment.amount);
        if let Some(paid) = mismatch {
            warn!("🔄️📥️ Callback for [{id}] reports {paid}, but {} was requested", payment.amount);
        }
        let code = payload.result.result_code.value();
        let Some(mut settlement) = settlement_for(&payment, payload.result, "CBK") else {
            return Ok(CallbackDisposition::Undetermined(code));
        };
        if let Some(paid) = mismatch {
            settlement = settlement.with_note(format!("Amount mismatch: paid {paid}, requested {}", payment.amount));
        }
        match self.settle(&payment, settlement).await? {
            Some(settled) => Ok(CallbackDisposition::Settled(settled)),
            None => {
                let current = self.require_payment(id).await?;
                Ok(CallbackDisposition::AlreadyTerminal(current.status))
            },
        }
    }

    /// Creates the order for a completed payment, then updates inventory, clears the payer's cart and notifies them.
    ///
    /// If an order already exists for the payment, nothing else happens and the existing order is returned.
    pub async fn finalize(&self, payment: &PaymentRequest) -> Result<InsertOrderResult, PaymentFlowError> {
        if payment.status != PaymentStatus::Completed {
            return Err(PaymentFlowError::NotCompleted(payment.id.clone()));
        }
        if let Some(existing) = self.db.fetch_order_by_payment_ref(&payment.id).await? {
            debug!("🔄️📦️ Payment [{}] already has order #{}", payment.id, existing.id);
            return Ok(InsertOrderResult::AlreadyExists(existing));
        }
        let cart = self.db.fetch_cart(&payment.payer_id).await?;
        let order = NewOrder::for_payment(payment, &cart, self.config.shipping_fee);
        let retry = &self.config.retry;
        let label = format!("Creating the order for payment [{}]", payment.id);
        let order = match with_backoff(retry, &label, || self.db.insert_order(order.clone())).await? {
            InsertOrderResult::Inserted(order) => order,
            existing @ InsertOrderResult::AlreadyExists(_) => {
                debug!("🔄️📦️ Payment [{}] has already been finalized", payment.id);
                return Ok(existing);
            },
        };
        info!("🔄️📦️ Order #{} ({}) created for payment [{}]. Total {}", order.id, order.order_ref, payment.id, order.total);
        for line in &order.line_items {
            let label = format!("Decrementing stock of {}", line.product_ref);
            let decremented =
                with_backoff(retry, &label, || self.db.decrement_inventory(&line.product_ref, line.quantity)).await;
            if decremented.is_err() {
                error!("🔄️📦️ Stock for {} was not updated after order #{}", line.product_ref, order.id);
            }
        }
        let label = format!("Clearing the cart of {}", payment.payer_id);
        match with_backoff(retry, &label, || self.db.clear_cart(&payment.payer_id)).await {
            Ok(n) => trace!("🔄️📦️ Removed {n} items from the cart of {}", payment.payer_id),
            Err(_) => error!("🔄️📦️ The cart of {} was not cleared after order #{}", payment.payer_id, order.id),
        }
        self.notify(&order.payer_id, Notification::order_created(&order)).await;
        Ok(InsertOrderResult::Inserted(order))
    }

    /// Re-runs finalization for a completed payment. Used by operators to repair unmatched payments found during
    /// reconciliation.
    pub async fn finalize_by_id(&self, id: &str) -> Result<InsertOrderResult, PaymentFlowError> {
        let payment = self.require_payment(id).await?;
        self.finalize(&payment).await
    }

    async fn require_payment(&self, id: &str) -> Result<PaymentRequest, PaymentFlowError> {
        self.db.fetch_payment_request(id).await?.ok_or_else(|| PaymentFlowError::PaymentNotFound(id.to_string()))
    }

    async fn resolve_pending(&self, payment: PaymentRequest) -> Result<PaymentRequest, PaymentFlowError> {
        let id = payment.id.clone();
        let result = match self.gateway.query_status(&id).await {
            Ok(QueryOutcome::Terminal(result)) => result,
            Ok(QueryOutcome::StillProcessing) => {
                trace!("🔄️🔍️ Gateway is still processing [{id}]");
                return Ok(payment);
            },
            Err(e) => {
                warn!("🔄️🔍️ Could not query the status of [{id}]. It stays pending. {e}");
                return Ok(payment);
            },
        };
        let Some(settlement) = settlement_for(&payment, result, "QRY") else {
            return Ok(payment);
        };
        match self.settle(&payment, settlement).await? {
            Some(settled) => Ok(settled),
            None => self.require_payment(&id).await,
        }
    }

    /// Compare-and-set from pending. Only the caller that wins the write notifies and finalizes.
    async fn settle(
        &self,
        payment: &PaymentRequest,
        settlement: PaymentSettlement,
    ) -> Result<Option<PaymentRequest>, PaymentFlowError> {
        let Some(settled) = self.db.settle_payment(&payment.id, settlement).await? else {
            debug!("🔄️ Payment [{}] was settled by someone else first", payment.id);
            return Ok(None);
        };
        info!("🔄️ Payment [{}] is {}. {}", settled.id, settled.status, settled.result_description.as_deref().unwrap_or(""));
        self.notify(&settled.payer_id, Notification::payment_settled(&settled)).await;
        if settled.status == PaymentStatus::Completed {
            // The payment is recorded. An order that still fails after retries is left for reconciliation.
            if let Err(e) = self.finalize(&settled).await {
                error!("🔄️📦️ Could not create the order for completed payment [{}]. {e}", settled.id);
            }
        }
        Ok(Some(settled))
    }

    async fn notify(&self, user_id: &str, notification: Notification) {
        if let Err(e) = self.notifier.push(user_id, notification).await {
            warn!("🔄️📬️ Could not notify {user_id}. {e}");
        }
    }
}

/// Translates a gateway result into a settlement, or `None` if the result code does not tell us how the payment
/// ended. A completion without a receipt gets a synthetic one made from `receipt_prefix` and the payment id.
fn settlement_for(payment: &PaymentRequest, result: GatewayResult, receipt_prefix: &str) -> Option<PaymentSettlement> {
    let code = result.result_code;
    let description = Some(result.description.trim().to_string())
        .filter(|d| !d.is_empty())
        .or_else(|| code.meaning().map(String::from))
        .unwrap_or_else(|| format!("Result code {code}"));
    match code.outcome() {
        PaymentOutcome::Completed => {
            let receipt = result.receipt_ref.filter(|r| !r.trim().is_empty()).unwrap_or_else(|| {
                warn!("🔄️ Completion for [{}] carries no receipt. Using a synthetic reference.", payment.id);
                format!("{receipt_prefix}-{}", payment.id)
            });
            Some(PaymentSettlement::completed(code.value(), description, receipt))
        },
        PaymentOutcome::Failed => Some(PaymentSettlement::failed(Some(code.value()), description)),
        PaymentOutcome::Undetermined => {
            warn!(
                "🔄️ Unrecognised result code {code} for [{}] ({description}). Leaving it pending for investigation.",
                payment.id
            );
            None
        },
    }
}
