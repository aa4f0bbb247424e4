use pesa_common::{Amount, PhoneNumber};
use serde::{Deserialize, Serialize};

use crate::{helpers::lenient_i64, ResultCode};

/// A request to push a payment prompt to the customer's phone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushRequest {
    pub phone: PhoneNumber,
    pub amount: Amount,
    /// Shown to the customer on the prompt. We use the order reference.
    pub account_reference: String,
    pub description: String,
}

/// The gateway accepted the push request. The customer has not paid yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushAccepted {
    /// The `CheckoutRequestID`. Every later callback and status query refers to the payment by this id.
    pub correlation_id: String,
    pub merchant_request_id: String,
    pub customer_message: String,
}

/// A result the gateway reported for a payment, either through a callback or a status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayResult {
    pub result_code: ResultCode,
    pub description: String,
    /// The gateway's transaction receipt. Only callbacks for successful payments carry one.
    pub receipt_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    Terminal(GatewayResult),
    /// The customer has not responded to the prompt yet.
    StillProcessing,
}

//--------------------------------------    Wire formats     ---------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AuthResponse {
    pub access_token: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub expires_in: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct StkPushBody {
    pub business_short_code: String,
    pub password: String,
    pub timestamp: String,
    pub transaction_type: String,
    pub amount: i64,
    pub party_a: String,
    pub party_b: String,
    pub phone_number: String,
    #[serde(rename = "CallBackURL")]
    pub callback_url: String,
    pub account_reference: String,
    pub transaction_desc: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct StkPushResponse {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    pub response_code: String,
    pub response_description: String,
    #[serde(default)]
    pub customer_message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct StkQueryBody {
    pub business_short_code: String,
    pub password: String,
    pub timestamp: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct StkQueryResponse {
    #[serde(default)]
    pub response_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub result_code: Option<i64>,
    #[serde(default)]
    pub result_desc: Option<String>,
}

/// The body the gateway returns alongside a non-2xx status.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub request_id: Option<String>,
    pub error_code: String,
    pub error_message: String,
}
