use std::fmt::Display;

use chrono::NaiveDate;
use pesa_common::Amount;
use pesa_engine::{
    db_types::{Order, OrderStatusType, PaymentRequest, PaymentStatus},
    traits::InsertOrderResult,
    ManualOrder,
    ManualOrderLine,
    PaymentInitiation,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }
}

//--------------------------------------       Payments        ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentRequest {
    pub phone: String,
    pub amount: i64,
    pub order_ref: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<InitiatePaymentRequest> for PaymentInitiation {
    fn from(req: InitiatePaymentRequest) -> Self {
        Self { phone: req.phone, amount: req.amount, order_ref: req.order_ref, description: req.description }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentResponse {
    pub correlation_id: String,
    pub status: PaymentStatus,
    pub customer_message: String,
}

impl InitiatePaymentResponse {
    pub fn new(payment: &PaymentRequest) -> Self {
        Self {
            correlation_id: payment.id.clone(),
            status: payment.status,
            customer_message: "Check your phone and enter your PIN to complete the payment".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusResponse {
    pub correlation_id: String,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_ref: Option<String>,
}

impl From<PaymentRequest> for PaymentStatusResponse {
    fn from(p: PaymentRequest) -> Self {
        Self {
            correlation_id: p.id,
            status: p.status,
            result_code: p.result_code,
            result_description: p.result_description,
            receipt_ref: p.receipt_ref,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportFailureRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// The acknowledgement the gateway expects for every callback, whatever happened to it on our side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackAck {
    #[serde(rename = "ResultCode")]
    pub result_code: i64,
    #[serde(rename = "ResultDesc")]
    pub result_desc: String,
}

impl CallbackAck {
    pub fn accepted() -> Self {
        Self { result_code: 0, result_desc: "Accepted".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeResponse {
    /// False if an order already existed for the payment
    pub created: bool,
    pub order: Order,
}

impl From<InsertOrderResult> for FinalizeResponse {
    fn from(result: InsertOrderResult) -> Self {
        match result {
            InsertOrderResult::Inserted(order) => Self { created: true, order },
            InsertOrderResult::AlreadyExists(order) => Self { created: false, order },
        }
    }
}

//--------------------------------------        Admin          ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileParams {
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatusType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualOrderLineRequest {
    pub product_ref: String,
    pub quantity: i64,
    pub unit_price: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualOrderRequest {
    pub order_ref: String,
    pub payer_id: String,
    pub line_items: Vec<ManualOrderLineRequest>,
    #[serde(default)]
    pub shipping_fee: Option<Amount>,
}

impl From<ManualOrderRequest> for ManualOrder {
    fn from(req: ManualOrderRequest) -> Self {
        let line_items = req
            .line_items
            .into_iter()
            .map(|l| ManualOrderLine { product_ref: l.product_ref, quantity: l.quantity, unit_price: l.unit_price })
            .collect();
        Self { order_ref: req.order_ref, payer_id: req.payer_id, line_items, shipping_fee: req.shipping_fee }
    }
}
