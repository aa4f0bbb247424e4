use crate::{
    db_types::{CartItem, NewOrder, Order, OrderStatusType},
    traits::StoreError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOrderResult {
    Inserted(Order),
    /// An order for the same payment already exists. Nothing was written.
    AlreadyExists(Order),
}

impl InsertOrderResult {
    pub fn order(&self) -> &Order {
        match self {
            InsertOrderResult::Inserted(o) | InsertOrderResult::AlreadyExists(o) => o,
        }
    }
}

/// Orders, and the cart and inventory records that order creation touches.
#[allow(async_fn_in_trait)]
pub trait OrderStore: Clone {
    /// Inserts the order and its line items in a single transaction.
    ///
    /// If the order references a payment that already has an order, the existing order is returned and nothing is
    /// written. Orders without a payment reference are always inserted.
    async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, StoreError>;

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, StoreError>;

    async fn fetch_order_by_payment_ref(&self, payment_ref: &str) -> Result<Option<Order>, StoreError>;

    /// Orders whose payment reference is one of `payment_refs`.
    async fn orders_for_payment_refs(&self, payment_refs: &[String]) -> Result<Vec<Order>, StoreError>;

    async fn orders_for_payer(&self, payer_id: &str) -> Result<Vec<Order>, StoreError>;

    /// Changes the order status, provided the current status allows it. See [`OrderStatusType::can_transition_to`].
    async fn update_order_status(&self, id: i64, status: OrderStatusType) -> Result<Order, StoreError>;

    /// Deletes the order and its line items. Returns false if there was no such order.
    async fn delete_order(&self, id: i64) -> Result<bool, StoreError>;

    async fn fetch_cart(&self, payer_id: &str) -> Result<Vec<CartItem>, StoreError>;

    /// Adds the item to the payer's cart, replacing any existing line for the same product.
    async fn upsert_cart_item(&self, item: CartItem) -> Result<(), StoreError>;

    /// Empties the payer's cart, returning the number of lines removed.
    async fn clear_cart(&self, payer_id: &str) -> Result<u64, StoreError>;

    /// Reduces the stock count of a product by `quantity`, stopping at zero. Unknown products are ignored.
    async fn decrement_inventory(&self, product_ref: &str, quantity: i64) -> Result<(), StoreError>;

    async fn set_inventory(&self, product_ref: &str, quantity: i64) -> Result<(), StoreError>;

    async fn fetch_inventory(&self, product_ref: &str) -> Result<Option<i64>, StoreError>;
}
