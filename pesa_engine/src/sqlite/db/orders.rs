use chrono::Utc;
use log::*;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{LineItem, NewOrder, Order, OrderStatusType},
    traits::{InsertOrderResult, StoreError},
};

/// Inserts the order unless another order already references the same payment.
///
/// The insert is attempted first so that the transaction takes the write lock straight away. The unique index on
/// `orders.payment_ref` rejects a second order for the same payment, in which case the existing order is returned.
pub async fn idempotent_insert(order: NewOrder, conn: &mut SqliteConnection) -> Result<InsertOrderResult, StoreError> {
    order.validate().map_err(StoreError::InvalidOrder)?;
    let payment_ref = order.payment_ref.clone();
    match insert_order(order, conn).await {
        Ok(order) => Ok(InsertOrderResult::Inserted(order)),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            debug!("🗃️ An order for payment {payment_ref:?} already exists");
            existing_order_for(payment_ref.as_deref(), conn)
                .await?
                .map(InsertOrderResult::AlreadyExists)
                .ok_or_else(|| StoreError::DatabaseError(format!("Order for {payment_ref:?} vanished")))
        },
        Err(e) => Err(e.into()),
    }
}

async fn existing_order_for(
    payment_ref: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, StoreError> {
    match payment_ref {
        Some(payment_ref) => fetch_order_by_payment_ref(payment_ref, conn).await,
        None => Ok(None),
    }
}

/// Inserts a new order and its line items using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let now = Utc::now();
    let mut record: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_ref,
                payer_id,
                subtotal,
                shipping_fee,
                total,
                status,
                payment_ref,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *;
        "#,
    )
    .bind(&order.order_ref)
    .bind(&order.payer_id)
    .bind(order.subtotal())
    .bind(order.shipping_fee)
    .bind(order.total())
    .bind(order.status)
    .bind(&order.payment_ref)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    for line in &order.line_items {
        sqlx::query(
            r#"
                INSERT INTO order_items (order_id, product_ref, quantity, unit_price, line_subtotal)
                VALUES ($1, $2, $3, $4, $5);
            "#,
        )
        .bind(record.id)
        .bind(&line.product_ref)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.line_subtotal)
        .execute(&mut *conn)
        .await?;
    }
    record.line_items = order.line_items;
    debug!("🗃️ Order #{} ({}) inserted with {} lines", record.id, record.order_ref, record.line_items.len());
    Ok(record)
}

async fn fetch_line_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<LineItem>, StoreError> {
    let items = sqlx::query_as(
        "SELECT product_ref, quantity, unit_price, line_subtotal FROM order_items WHERE order_id = $1 ORDER BY id",
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;
    Ok(items)
}

async fn with_line_items(mut orders: Vec<Order>, conn: &mut SqliteConnection) -> Result<Vec<Order>, StoreError> {
    for order in orders.iter_mut() {
        order.line_items = fetch_line_items(order.id, conn).await?;
    }
    Ok(orders)
}

async fn attach_line_items(order: Option<Order>, conn: &mut SqliteConnection) -> Result<Option<Order>, StoreError> {
    match order {
        Some(mut o) => {
            o.line_items = fetch_line_items(o.id, conn).await?;
            Ok(Some(o))
        },
        None => Ok(None),
    }
}

pub async fn fetch_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, StoreError> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(&mut *conn).await?;
    attach_line_items(order, conn).await
}

pub async fn fetch_order_by_payment_ref(
    payment_ref: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, StoreError> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE payment_ref = $1")
        .bind(payment_ref)
        .fetch_optional(&mut *conn)
        .await?;
    attach_line_items(order, conn).await
}

pub async fn orders_for_payment_refs(
    payment_refs: &[String],
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, StoreError> {
    if payment_refs.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM orders WHERE payment_ref IN (");
    let mut refs = builder.separated(", ");
    for payment_ref in payment_refs {
        refs.push_bind(payment_ref);
    }
    refs.push_unseparated(") ORDER BY id");
    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(&mut *conn).await?;
    with_line_items(orders, conn).await
}

pub async fn orders_for_payer(payer_id: &str, conn: &mut SqliteConnection) -> Result<Vec<Order>, StoreError> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE payer_id = $1 ORDER BY created_at DESC")
        .bind(payer_id)
        .fetch_all(&mut *conn)
        .await?;
    with_line_items(orders, conn).await
}

/// Moves the order to `status` if the transition is allowed. Run this inside a transaction so that the check and the
/// update see the same row.
pub async fn update_order_status(
    id: i64,
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Order, StoreError> {
    let order = fetch_order(id, conn).await?.ok_or(StoreError::OrderNotFound(id))?;
    if !order.status.can_transition_to(status) {
        return Err(StoreError::ForbiddenTransition { id, from: order.status, to: status });
    }
    let mut updated: Order = sqlx::query_as("UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3 RETURNING *")
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    updated.line_items = order.line_items;
    debug!("🗃️ Order #{id} moved from {} to {status}", order.status);
    Ok(updated)
}

pub async fn delete_order(id: i64, conn: &mut SqliteConnection) -> Result<bool, StoreError> {
    sqlx::query("DELETE FROM order_items WHERE order_id = $1").bind(id).execute(&mut *conn).await?;
    let result = sqlx::query("DELETE FROM orders WHERE id = $1").bind(id).execute(&mut *conn).await?;
    Ok(result.rows_affected() > 0)
}
