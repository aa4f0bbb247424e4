use crate::{GatewayError, PushAccepted, PushRequest, QueryOutcome};

/// The operations the payment engine needs from a push-payment provider.
///
/// [`crate::GatewayApi`] talks to the real gateway. Tests substitute scripted implementations.
#[allow(async_fn_in_trait)]
pub trait PushPaymentProvider {
    /// Send a payment prompt to the customer's phone. On success, the returned correlation id identifies the payment
    /// in all later callbacks and queries.
    async fn initiate_push(&self, request: PushRequest) -> Result<PushAccepted, GatewayError>;

    /// Ask the gateway what happened to the payment with the given correlation id.
    async fn query_status(&self, correlation_id: &str) -> Result<QueryOutcome, GatewayError>;
}
