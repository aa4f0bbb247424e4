use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use chrono::{DateTime, Utc};
use pesa_engine::{
    db_types::{
        Amount,
        CartItem,
        NewOrder,
        NewPaymentRequest,
        Order,
        OrderStatusType,
        PaymentRequest,
        PaymentSettlement,
        PhoneNumber,
    },
    traits::{InsertOrderResult, OrderStore, PaymentStore, StoreError},
    SqliteDatabase,
};

/// Wraps a real database, but fails the next few order inserts with a transient database error.
#[derive(Clone)]
pub struct FlakyOrderStore {
    inner: SqliteDatabase,
    insert_failures: Arc<AtomicUsize>,
    insert_calls: Arc<AtomicUsize>,
}

impl FlakyOrderStore {
    pub fn new(inner: SqliteDatabase, insert_failures: usize) -> Self {
        Self { inner, insert_failures: Arc::new(AtomicUsize::new(insert_failures)), insert_calls: Arc::default() }
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }
}

impl PaymentStore for FlakyOrderStore {
    async fn insert_payment_request(&self, request: NewPaymentRequest) -> Result<PaymentRequest, StoreError> {
        self.inner.insert_payment_request(request).await
    }

    async fn fetch_payment_request(&self, id: &str) -> Result<Option<PaymentRequest>, StoreError> {
        self.inner.fetch_payment_request(id).await
    }

    async fn find_recent_duplicate(
        &self,
        payer_id: &str,
        phone: &PhoneNumber,
        amount: Amount,
        since: DateTime<Utc>,
    ) -> Result<Option<PaymentRequest>, StoreError> {
        self.inner.find_recent_duplicate(payer_id, phone, amount, since).await
    }

    async fn settle_payment(
        &self,
        id: &str,
        settlement: PaymentSettlement,
    ) -> Result<Option<PaymentRequest>, StoreError> {
        self.inner.settle_payment(id, settlement).await
    }

    async fn payments_for_payer(&self, payer_id: &str) -> Result<Vec<PaymentRequest>, StoreError> {
        self.inner.payments_for_payer(payer_id).await
    }

    async fn completed_payments_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PaymentRequest>, StoreError> {
        self.inner.completed_payments_between(start, end).await
    }

    async fn pending_payments_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<PaymentRequest>, StoreError> {
        self.inner.pending_payments_older_than(cutoff).await
    }
}

impl OrderStore for FlakyOrderStore {
    async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, StoreError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self.insert_failures.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(StoreError::DatabaseError("database is locked".into()));
        }
        self.inner.insert_order(order).await
    }

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, StoreError> {
        self.inner.fetch_order(id).await
    }

    async fn fetch_order_by_payment_ref(&self, payment_ref: &str) -> Result<Option<Order>, StoreError> {
        self.inner.fetch_order_by_payment_ref(payment_ref).await
    }

    async fn orders_for_payment_refs(&self, payment_refs: &[String]) -> Result<Vec<Order>, StoreError> {
        self.inner.orders_for_payment_refs(payment_refs).await
    }

    async fn orders_for_payer(&self, payer_id: &str) -> Result<Vec<Order>, StoreError> {
        self.inner.orders_for_payer(payer_id).await
    }

    async fn update_order_status(&self, id: i64, status: OrderStatusType) -> Result<Order, StoreError> {
        self.inner.update_order_status(id, status).await
    }

    async fn delete_order(&self, id: i64) -> Result<bool, StoreError> {
        self.inner.delete_order(id).await
    }

    async fn fetch_cart(&self, payer_id: &str) -> Result<Vec<CartItem>, StoreError> {
        self.inner.fetch_cart(payer_id).await
    }

    async fn upsert_cart_item(&self, item: CartItem) -> Result<(), StoreError> {
        self.inner.upsert_cart_item(item).await
    }

    async fn clear_cart(&self, payer_id: &str) -> Result<u64, StoreError> {
        self.inner.clear_cart(payer_id).await
    }

    async fn decrement_inventory(&self, product_ref: &str, quantity: i64) -> Result<(), StoreError> {
        self.inner.decrement_inventory(product_ref, quantity).await
    }

    async fn set_inventory(&self, product_ref: &str, quantity: i64) -> Result<(), StoreError> {
        self.inner.set_inventory(product_ref, quantity).await
    }

    async fn fetch_inventory(&self, product_ref: &str) -> Result<Option<i64>, StoreError> {
        self.inner.fetch_inventory(product_ref).await
    }
}
