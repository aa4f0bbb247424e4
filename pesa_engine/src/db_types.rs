use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
pub use pesa_common::{Amount, PhoneNumber};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid status: {0}")]
pub struct ConversionError(String);

//--------------------------------------    PaymentStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// The push was accepted by the gateway, and we are waiting to hear whether the customer paid.
    Pending,
    /// The customer paid. A receipt reference is always attached.
    Completed,
    /// The customer did not pay, for the reason recorded in the result description.
    Failed,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Pending"),
            PaymentStatus::Completed => write!(f, "Completed"),
            PaymentStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

//--------------------------------------    PaymentRequest    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// The correlation id (`CheckoutRequestID`) assigned by the gateway
    pub id: String,
    pub merchant_request_id: Option<String>,
    /// The caller's reference for the order this payment is for
    pub order_ref: String,
    pub payer_id: String,
    pub phone: PhoneNumber,
    pub amount: Amount,
    pub description: Option<String>,
    pub status: PaymentStatus,
    pub result_code: Option<i64>,
    pub result_description: Option<String>,
    pub receipt_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub terminal_at: Option<DateTime<Utc>>,
}

impl PaymentRequest {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[derive(Debug, Clone)]
pub struct NewPaymentRequest {
    pub id: String,
    pub merchant_request_id: Option<String>,
    pub order_ref: String,
    pub payer_id: String,
    pub phone: PhoneNumber,
    pub amount: Amount,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The terminal outcome to record against a pending payment. The constructors guarantee that completed payments carry
/// a receipt and failed payments carry a reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSettlement {
    status: PaymentStatus,
    result_code: Option<i64>,
    result_description: String,
    receipt_ref: Option<String>,
}

impl PaymentSettlement {
    pub fn completed(result_code: i64, description: String, receipt_ref: String) -> Self {
        Self {
            status: PaymentStatus::Completed,
            result_code: Some(result_code),
            result_description: description,
            receipt_ref: Some(receipt_ref),
        }
    }

    pub fn failed(result_code: Option<i64>, description: String) -> Self {
        Self { status: PaymentStatus::Failed, result_code, result_description: description, receipt_ref: None }
    }

    /// Appends `note` to the result description, e.g. to flag a discrepancy for operators.
    pub fn with_note(mut self, note: String) -> Self {
        if self.result_description.is_empty() {
            self.result_description = note;
        } else {
            self.result_description = format!("{}. {note}", self.result_description.trim_end_matches('.'));
        }
        self
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn result_code(&self) -> Option<i64> {
        self.result_code
    }

    pub fn result_description(&self) -> &str {
        &self.result_description
    }

    pub fn receipt_ref(&self) -> Option<&str> {
        self.receipt_ref.as_deref()
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// Created by an admin, and not paid for yet.
    Pending,
    /// Paid in full. Orders created from a completed payment start here.
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatusType {
    /// Whether an admin may move an order from this status to `next`.
    pub fn can_transition_to(&self, next: OrderStatusType) -> bool {
        use OrderStatusType::*;
        matches!(
            (self, next),
            (Pending, Paid) |
                (Pending, Cancelled) |
                (Paid, Processing) |
                (Paid, Cancelled) |
                (Processing, Shipped) |
                (Processing, Cancelled) |
                (Shipped, Delivered)
        )
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatusType::Pending => "Pending",
            OrderStatusType::Paid => "Paid",
            OrderStatusType::Processing => "Processing",
            OrderStatusType::Shipped => "Shipped",
            OrderStatusType::Delivered => "Delivered",
            OrderStatusType::Cancelled => "Cancelled",
        };
        f.write_str(s)
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Paid" => Ok(Self::Paid),
            "Processing" => Ok(Self::Processing),
            "Shipped" => Ok(Self::Shipped),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct LineItem {
    pub product_ref: String,
    pub quantity: i64,
    pub unit_price: Amount,
    pub line_subtotal: Amount,
}

impl LineItem {
    pub fn new<S: Into<String>>(product_ref: S, quantity: i64, unit_price: Amount) -> Self {
        Self { product_ref: product_ref.into(), quantity, unit_price, line_subtotal: unit_price * quantity }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_ref: String,
    pub payer_id: String,
    #[sqlx(skip)]
    pub line_items: Vec<LineItem>,
    pub subtotal: Amount,
    pub shipping_fee: Amount,
    pub total: Amount,
    pub status: OrderStatusType,
    /// The payment this order was created from. `None` for orders created manually by an admin.
    pub payment_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub order_ref: String,
    pub payer_id: String,
    pub line_items: Vec<LineItem>,
    pub shipping_fee: Amount,
    pub status: OrderStatusType,
    pub payment_ref: Option<String>,
}

impl NewOrder {
    /// Builds the order for a completed payment from the payer's cart.
    ///
    /// The cart is only used if its value matches what was paid. Otherwise the order gets a single line for the paid
    /// amount, keyed by the payment's order reference.
    pub fn for_payment(payment: &PaymentRequest, cart: &[CartItem], shipping_fee: Amount) -> Self {
        let cart_lines = cart.iter().map(LineItem::from).collect::<Vec<LineItem>>();
        let cart_value = cart_lines.iter().try_fold(Amount::default(), |acc, l| acc.checked_add(l.line_subtotal));
        let line_items = if !cart_lines.is_empty() && cart_value == Some(payment.amount) {
            cart_lines
        } else {
            vec![LineItem::new(payment.order_ref.clone(), 1, payment.amount)]
        };
        Self {
            order_ref: payment.order_ref.clone(),
            payer_id: payment.payer_id.clone(),
            line_items,
            shipping_fee,
            status: OrderStatusType::Paid,
            payment_ref: Some(payment.id.clone()),
        }
    }

    pub fn subtotal(&self) -> Amount {
        self.line_items.iter().map(|l| l.line_subtotal).sum()
    }

    pub fn total(&self) -> Amount {
        self.subtotal() + self.shipping_fee
    }

    /// Checks the order invariants: at least one line, positive quantities, consistent line subtotals, a
    /// non-negative shipping fee and a total that fits in an [`Amount`].
    pub fn validate(&self) -> Result<(), String> {
        if self.line_items.is_empty() {
            return Err("An order must have at least one line item".to_string());
        }
        if self.shipping_fee.value() < 0 {
            return Err(format!("Shipping fee cannot be negative: {}", self.shipping_fee));
        }
        for line in &self.line_items {
            if line.quantity <= 0 {
                return Err(format!("Quantity for {} must be positive", line.product_ref));
            }
            if line.unit_price.value() < 0 {
                return Err(format!("Unit price for {} cannot be negative", line.product_ref));
            }
            match line.unit_price.checked_mul(line.quantity) {
                None => return Err(format!("Line subtotal for {} is too large", line.product_ref)),
                Some(subtotal) if subtotal != line.line_subtotal => {
                    return Err(format!("Line subtotal for {} does not equal quantity * unit price", line.product_ref));
                },
                Some(_) => {},
            }
        }
        let total = self
            .line_items
            .iter()
            .try_fold(self.shipping_fee, |acc, l| acc.checked_add(l.line_subtotal));
        if total.is_none() {
            return Err("Order total is too large".to_string());
        }
        Ok(())
    }
}

//--------------------------------------   Carts & inventory   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CartItem {
    pub payer_id: String,
    pub product_ref: String,
    pub quantity: i64,
    pub unit_price: Amount,
}

impl From<&CartItem> for LineItem {
    fn from(item: &CartItem) -> Self {
        LineItem::new(item.product_ref.clone(), item.quantity, item.unit_price)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct InventoryItem {
    pub product_ref: String,
    pub quantity: i64,
}

//--------------------------------------    Reconciliation     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationEntry {
    pub payment_ref: String,
    pub order_ref: Option<String>,
    pub amount: Amount,
    pub receipt_ref: Option<String>,
    pub matched: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub date: NaiveDate,
    pub total_payments: i64,
    pub matched_count: i64,
    pub unmatched_count: i64,
    pub entries: Vec<ReconciliationEntry>,
    pub generated_at: DateTime<Utc>,
}

impl ReconciliationReport {
    pub fn new(date: NaiveDate, entries: Vec<ReconciliationEntry>) -> Self {
        let matched_count = entries.iter().filter(|e| e.matched).count() as i64;
        let total_payments = entries.len() as i64;
        Self {
            date,
            total_payments,
            matched_count,
            unmatched_count: total_payments - matched_count,
            entries,
            generated_at: Utc::now(),
        }
    }

    pub fn unmatched(&self) -> impl Iterator<Item = &ReconciliationEntry> {
        self.entries.iter().filter(|e| !e.matched)
    }
}

//--------------------------------------     Notification      ---------------------------------------------------------
/// A status update pushed to a connected client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Notification {
    OrderCreated { order_id: i64, order_ref: String, payment_ref: Option<String>, total: Amount },
    PaymentSettled { correlation_id: String, status: PaymentStatus, receipt_ref: Option<String> },
}

impl Notification {
    pub fn order_created(order: &Order) -> Self {
        Self::OrderCreated {
            order_id: order.id,
            order_ref: order.order_ref.clone(),
            payment_ref: order.payment_ref.clone(),
            total: order.total,
        }
    }

    pub fn payment_settled(payment: &PaymentRequest) -> Self {
        Self::PaymentSettled {
            correlation_id: payment.id.clone(),
            status: payment.status,
            receipt_ref: payment.receipt_ref.clone(),
        }
    }
}
