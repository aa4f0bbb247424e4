//! Parsing of the webhook the gateway POSTs once the customer has responded to the payment prompt.
//!
//! ```json
//! { "Body": { "stkCallback": {
//!     "MerchantRequestID": "29115-34620561-1",
//!     "CheckoutRequestID": "ws_CO_191220191020363925",
//!     "ResultCode": 0,
//!     "ResultDesc": "The service request is processed successfully.",
//!     "CallbackMetadata": { "Item": [
//!         { "Name": "Amount", "Value": 100 },
//!         { "Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV" },
//!         { "Name": "PhoneNumber", "Value": 254712345678 } ] } } } }
//! ```
//!
//! Only the correlation id, result code and description are required. Failed payments carry no metadata.
use pesa_common::Amount;
use serde_json::Value;

use crate::{helpers::value_as_i64, GatewayError, GatewayResult, ResultCode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackPayload {
    pub correlation_id: String,
    pub merchant_request_id: Option<String>,
    pub result: GatewayResult,
    pub amount: Option<Amount>,
    pub phone: Option<String>,
}

pub fn parse_callback(body: &[u8]) -> Result<CallbackPayload, GatewayError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| GatewayError::MalformedCallback(format!("Invalid JSON. {e}")))?;
    let callback = &value["Body"]["stkCallback"];
    if !callback.is_object() {
        return Err(GatewayError::MalformedCallback("'Body.stkCallback' is missing".to_string()));
    }
    let correlation_id = callback["CheckoutRequestID"]
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| GatewayError::MalformedCallback("'CheckoutRequestID' is missing".to_string()))?
        .to_string();
    let result_code = value_as_i64(&callback["ResultCode"])
        .map(ResultCode::from)
        .ok_or_else(|| GatewayError::MalformedCallback(format!("'ResultCode' is missing in {correlation_id}")))?;
    let description = callback["ResultDesc"]
        .as_str()
        .ok_or_else(|| GatewayError::MalformedCallback(format!("'ResultDesc' is missing in {correlation_id}")))?
        .to_string();
    let merchant_request_id = callback["MerchantRequestID"].as_str().map(String::from);
    let items = callback["CallbackMetadata"]["Item"].as_array().map(Vec::as_slice).unwrap_or_default();
    let item = |name: &str| items.iter().find(|i| i["Name"].as_str() == Some(name)).map(|i| &i["Value"]);
    let receipt_ref = item("MpesaReceiptNumber").and_then(Value::as_str).map(String::from);
    let amount = item("Amount").and_then(value_as_i64).map(Amount::from);
    let phone = item("PhoneNumber").and_then(|v| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });
    Ok(CallbackPayload {
        correlation_id,
        merchant_request_id,
        result: GatewayResult { result_code, description, receipt_ref },
        amount,
        phone,
    })
}
