use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Amount, NewPaymentRequest, PaymentRequest, PaymentSettlement, PaymentStatus, PhoneNumber},
    traits::StoreError,
};

pub async fn insert_payment_request(
    request: NewPaymentRequest,
    conn: &mut SqliteConnection,
) -> Result<PaymentRequest, StoreError> {
    let id = request.id.clone();
    let result = sqlx::query_as(
        r#"
            INSERT INTO payment_requests (
                id,
                merchant_request_id,
                order_ref,
                payer_id,
                phone,
                amount,
                description,
                status,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *;
        "#,
    )
    .bind(request.id)
    .bind(request.merchant_request_id)
    .bind(request.order_ref)
    .bind(request.payer_id)
    .bind(request.phone)
    .bind(request.amount)
    .bind(request.description)
    .bind(PaymentStatus::Pending)
    .bind(request.created_at)
    .fetch_one(conn)
    .await;
    match result {
        Ok(payment) => {
            debug!("🗃️ Payment request [{id}] saved");
            Ok(payment)
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(StoreError::PaymentAlreadyExists(id)),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_payment_request(id: &str, conn: &mut SqliteConnection) -> Result<Option<PaymentRequest>, StoreError> {
    let payment = sqlx::query_as("SELECT * FROM payment_requests WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(payment)
}

pub async fn find_recent_duplicate(
    payer_id: &str,
    phone: &PhoneNumber,
    amount: Amount,
    since: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentRequest>, StoreError> {
    let payment = sqlx::query_as(
        r#"
            SELECT * FROM payment_requests
            WHERE payer_id = $1 AND phone = $2 AND amount = $3 AND created_at >= $4
            ORDER BY created_at DESC
            LIMIT 1;
        "#,
    )
    .bind(payer_id)
    .bind(phone.as_str())
    .bind(amount)
    .bind(since)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

/// A single conditional UPDATE, so the `status = 'Pending'` check and the write cannot be interleaved with another
/// writer.
pub async fn settle_payment(
    id: &str,
    settlement: &PaymentSettlement,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentRequest>, StoreError> {
    let payment: Option<PaymentRequest> = sqlx::query_as(
        r#"
            UPDATE payment_requests SET
                status = $2,
                result_code = $3,
                result_description = $4,
                receipt_ref = $5,
                terminal_at = $6
            WHERE id = $1 AND status = $7
            RETURNING *;
        "#,
    )
    .bind(id)
    .bind(settlement.status())
    .bind(settlement.result_code())
    .bind(settlement.result_description())
    .bind(settlement.receipt_ref())
    .bind(Utc::now())
    .bind(PaymentStatus::Pending)
    .fetch_optional(conn)
    .await?;
    match &payment {
        Some(p) => debug!("🗃️ Payment [{id}] settled as {}", p.status),
        None => trace!("🗃️ Payment [{id}] was not pending. Nothing was changed."),
    }
    Ok(payment)
}

pub async fn payments_for_payer(payer_id: &str, conn: &mut SqliteConnection) -> Result<Vec<PaymentRequest>, StoreError> {
    let payments = sqlx::query_as("SELECT * FROM payment_requests WHERE payer_id = $1 ORDER BY created_at DESC")
        .bind(payer_id)
        .fetch_all(conn)
        .await?;
    Ok(payments)
}

pub async fn completed_payments_between(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentRequest>, StoreError> {
    let payments = sqlx::query_as(
        r#"
            SELECT * FROM payment_requests
            WHERE status = $1 AND created_at >= $2 AND created_at < $3
            ORDER BY created_at ASC;
        "#,
    )
    .bind(PaymentStatus::Completed)
    .bind(start)
    .bind(end)
    .fetch_all(conn)
    .await?;
    Ok(payments)
}

pub async fn pending_payments_older_than(
    cutoff: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentRequest>, StoreError> {
    let payments = sqlx::query_as(
        "SELECT * FROM payment_requests WHERE status = $1 AND created_at < $2 ORDER BY created_at ASC",
    )
    .bind(PaymentStatus::Pending)
    .bind(cutoff)
    .fetch_all(conn)
    .await?;
    Ok(payments)
}
