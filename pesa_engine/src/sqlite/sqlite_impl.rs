//! `SqliteDatabase` is a concrete implementation of a Pesa engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the storage traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use chrono::{DateTime, NaiveDate, Utc};
use log::*;
use sqlx::{migrate::Migrator, SqlitePool};

use super::db::{carts, db_url, new_pool, orders, payments, reports};
use crate::{
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
        ReconciliationReport,
    },
    traits::{InsertOrderResult, OrderStore, PaymentStore, ReportStore, StoreError},
};

static MIGRATOR: Migrator = sqlx::migrate!("./src/sqlite/migrations");

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl PaymentStore for SqliteDatabase {
    async fn insert_payment_request(&self, request: NewPaymentRequest) -> Result<PaymentRequest, StoreError> {
        let mut conn = self.pool.acquire().await?;
        payments::insert_payment_request(request, &mut conn).await
    }

    async fn fetch_payment_request(&self, id: &str) -> Result<Option<PaymentRequest>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_payment_request(id, &mut conn).await
    }

    async fn find_recent_duplicate(
        &self,
        payer_id: &str,
        phone: &PhoneNumber,
        amount: Amount,
        since: DateTime<Utc>,
    ) -> Result<Option<PaymentRequest>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        payments::find_recent_duplicate(payer_id, phone, amount, since, &mut conn).await
    }

    async fn settle_payment(
        &self,
        id: &str,
        settlement: PaymentSettlement,
    ) -> Result<Option<PaymentRequest>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        payments::settle_payment(id, &settlement, &mut conn).await
    }

    async fn payments_for_payer(&self, payer_id: &str) -> Result<Vec<PaymentRequest>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        payments::payments_for_payer(payer_id, &mut conn).await
    }

    async fn completed_payments_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PaymentRequest>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        payments::completed_payments_between(start, end, &mut conn).await
    }

    async fn pending_payments_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<PaymentRequest>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        payments::pending_payments_older_than(cutoff, &mut conn).await
    }
}

impl OrderStore for SqliteDatabase {
    /// The existence check, order row and line items are written in a single transaction.
    async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = orders::idempotent_insert(order, &mut tx).await?;
        tx.commit().await?;
        if let InsertOrderResult::AlreadyExists(o) = &result {
            debug!("🗃️ Order #{} already exists for payment {:?}. Nothing was inserted.", o.id, o.payment_ref);
        }
        Ok(result)
    }

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(id, &mut conn).await
    }

    async fn fetch_order_by_payment_ref(&self, payment_ref: &str) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_payment_ref(payment_ref, &mut conn).await
    }

    async fn orders_for_payment_refs(&self, payment_refs: &[String]) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::orders_for_payment_refs(payment_refs, &mut conn).await
    }

    async fn orders_for_payer(&self, payer_id: &str) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::orders_for_payer(payer_id, &mut conn).await
    }

    async fn update_order_status(&self, id: i64, status: OrderStatusType) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::update_order_status(id, status, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn delete_order(&self, id: i64) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let deleted = orders::delete_order(id, &mut tx).await?;
        tx.commit().await?;
        if deleted {
            info!("🗃️ Order #{id} deleted");
        }
        Ok(deleted)
    }

    async fn fetch_cart(&self, payer_id: &str) -> Result<Vec<CartItem>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        carts::fetch_cart(payer_id, &mut conn).await
    }

    async fn upsert_cart_item(&self, item: CartItem) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        carts::upsert_cart_item(item, &mut conn).await
    }

    async fn clear_cart(&self, payer_id: &str) -> Result<u64, StoreError> {
        let mut conn = self.pool.acquire().await?;
        carts::clear_cart(payer_id, &mut conn).await
    }

    async fn decrement_inventory(&self, product_ref: &str, quantity: i64) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        carts::decrement_inventory(product_ref, quantity, &mut conn).await
    }

    async fn set_inventory(&self, product_ref: &str, quantity: i64) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        carts::set_inventory(product_ref, quantity, &mut conn).await
    }

    async fn fetch_inventory(&self, product_ref: &str) -> Result<Option<i64>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        carts::fetch_inventory(product_ref, &mut conn).await
    }
}

impl ReportStore for SqliteDatabase {
    async fn save_report(&self, report: &ReconciliationReport) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        reports::save_report(report, &mut conn).await
    }

    async fn fetch_report(&self, date: NaiveDate) -> Result<Option<ReconciliationReport>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        reports::fetch_report(date, &mut conn).await
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `PESA_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Brings the schema up to date. Safe to call on every start.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        MIGRATOR.run(&self.pool).await.map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
