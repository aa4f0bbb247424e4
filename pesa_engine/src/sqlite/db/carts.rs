//! Carts and stock counters. The storefront owns these. The engine only reads carts and decrements stock when an order
//! is created.
use log::*;
use sqlx::SqliteConnection;

use crate::{db_types::CartItem, traits::StoreError};

pub async fn fetch_cart(payer_id: &str, conn: &mut SqliteConnection) -> Result<Vec<CartItem>, StoreError> {
    let items = sqlx::query_as("SELECT * FROM cart_items WHERE payer_id = $1 ORDER BY product_ref")
        .bind(payer_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

pub async fn upsert_cart_item(item: CartItem, conn: &mut SqliteConnection) -> Result<(), StoreError> {
    sqlx::query(
        r#"
            INSERT INTO cart_items (payer_id, product_ref, quantity, unit_price) VALUES ($1, $2, $3, $4)
            ON CONFLICT (payer_id, product_ref) DO UPDATE SET quantity = excluded.quantity, unit_price = excluded.unit_price;
        "#,
    )
    .bind(item.payer_id)
    .bind(item.product_ref)
    .bind(item.quantity)
    .bind(item.unit_price)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn clear_cart(payer_id: &str, conn: &mut SqliteConnection) -> Result<u64, StoreError> {
    let result = sqlx::query("DELETE FROM cart_items WHERE payer_id = $1").bind(payer_id).execute(conn).await?;
    trace!("🗃️ Removed {} items from the cart of {payer_id}", result.rows_affected());
    Ok(result.rows_affected())
}

pub async fn decrement_inventory(
    product_ref: &str,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), StoreError> {
    let result = sqlx::query("UPDATE inventory SET quantity = MAX(quantity - $1, 0) WHERE product_ref = $2")
        .bind(quantity)
        .bind(product_ref)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        debug!("🗃️ {product_ref} is not a stocked product. Inventory was not changed.");
    }
    Ok(())
}

pub async fn set_inventory(product_ref: &str, quantity: i64, conn: &mut SqliteConnection) -> Result<(), StoreError> {
    sqlx::query(
        r#"
            INSERT INTO inventory (product_ref, quantity) VALUES ($1, $2)
            ON CONFLICT (product_ref) DO UPDATE SET quantity = excluded.quantity;
        "#,
    )
    .bind(product_ref)
    .bind(quantity.max(0))
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_inventory(product_ref: &str, conn: &mut SqliteConnection) -> Result<Option<i64>, StoreError> {
    let quantity = sqlx::query_scalar("SELECT quantity FROM inventory WHERE product_ref = $1")
        .bind(product_ref)
        .fetch_optional(conn)
        .await?;
    Ok(quantity)
}
