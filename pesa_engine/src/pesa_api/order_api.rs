use std::fmt::Debug;

use log::*;
use serde::{Deserialize, Serialize};

use super::errors::OrderApiError;
use crate::{
    db_types::{Amount, LineItem, NewOrder, Order, OrderStatusType},
    traits::{InsertOrderResult, OrderStore},
};

/// A line on a manually created order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualOrderLine {
    pub product_ref: String,
    pub quantity: i64,
    pub unit_price: Amount,
}

/// An order entered by an admin, outside of the payment flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualOrder {
    pub order_ref: String,
    pub payer_id: String,
    pub line_items: Vec<ManualOrderLine>,
    /// Uses the configured shipping fee when omitted
    pub shipping_fee: Option<Amount>,
}

/// Admin order management. Orders created here have no payment reference and start out `Pending`.
pub struct OrderApi<B> {
    db: B,
    default_shipping_fee: Amount,
}

impl<B> Debug for OrderApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderApi")
    }
}

impl<B> OrderApi<B> {
    pub fn new(db: B, default_shipping_fee: Amount) -> Self {
        Self { db, default_shipping_fee }
    }
}

impl<B> OrderApi<B>
where B: OrderStore
{
    pub async fn create_manual_order(&self, order: ManualOrder) -> Result<Order, OrderApiError> {
        if order.order_ref.trim().is_empty() || order.payer_id.trim().is_empty() {
            return Err(OrderApiError::InvalidOrder("orderRef and payerId are required".into()));
        }
        let line_items =
            order.line_items.into_iter().map(|l| LineItem::new(l.product_ref, l.quantity, l.unit_price)).collect();
        let new_order = NewOrder {
            order_ref: order.order_ref,
            payer_id: order.payer_id,
            line_items,
            shipping_fee: order.shipping_fee.unwrap_or(self.default_shipping_fee),
            status: OrderStatusType::Pending,
            payment_ref: None,
        };
        new_order.validate().map_err(OrderApiError::InvalidOrder)?;
        let order = match self.db.insert_order(new_order).await? {
            InsertOrderResult::Inserted(o) | InsertOrderResult::AlreadyExists(o) => o,
        };
        info!("🔄️📦️ Manual order #{} ({}) created for {}. Total {}", order.id, order.order_ref, order.payer_id, order.total);
        Ok(order)
    }

    pub async fn fetch_order(&self, id: i64) -> Result<Order, OrderApiError> {
        self.db.fetch_order(id).await?.ok_or(OrderApiError::OrderNotFound(id))
    }

    pub async fn orders_for_payer(&self, payer_id: &str) -> Result<Vec<Order>, OrderApiError> {
        Ok(self.db.orders_for_payer(payer_id).await?)
    }

    pub async fn update_status(&self, id: i64, status: OrderStatusType) -> Result<Order, OrderApiError> {
        let order = self.db.update_order_status(id, status).await?;
        info!("🔄️📦️ Order #{id} is now {status}");
        Ok(order)
    }

    pub async fn delete_order(&self, id: i64) -> Result<(), OrderApiError> {
        if self.db.delete_order(id).await? {
            Ok(())
        } else {
            Err(OrderApiError::OrderNotFound(id))
        }
    }
}
