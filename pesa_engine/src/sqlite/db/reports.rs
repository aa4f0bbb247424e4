use chrono::{DateTime, NaiveDate, Utc};
use log::*;
use sqlx::{types::Json, FromRow, SqliteConnection};

use crate::{
    db_types::{ReconciliationEntry, ReconciliationReport},
    traits::StoreError,
};

#[derive(FromRow)]
struct ReportRow {
    date: NaiveDate,
    total_payments: i64,
    matched_count: i64,
    unmatched_count: i64,
    entries: Json<Vec<ReconciliationEntry>>,
    generated_at: DateTime<Utc>,
}

impl From<ReportRow> for ReconciliationReport {
    fn from(row: ReportRow) -> Self {
        Self {
            date: row.date,
            total_payments: row.total_payments,
            matched_count: row.matched_count,
            unmatched_count: row.unmatched_count,
            entries: row.entries.0,
            generated_at: row.generated_at,
        }
    }
}

pub async fn save_report(report: &ReconciliationReport, conn: &mut SqliteConnection) -> Result<(), StoreError> {
    sqlx::query(
        r#"
            INSERT INTO reconciliation_reports (date, total_payments, matched_count, unmatched_count, entries, generated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (date) DO UPDATE SET
                total_payments = excluded.total_payments,
                matched_count = excluded.matched_count,
                unmatched_count = excluded.unmatched_count,
                entries = excluded.entries,
                generated_at = excluded.generated_at;
        "#,
    )
    .bind(report.date)
    .bind(report.total_payments)
    .bind(report.matched_count)
    .bind(report.unmatched_count)
    .bind(Json(&report.entries))
    .bind(report.generated_at)
    .execute(conn)
    .await?;
    debug!("🗃️ Reconciliation report for {} saved", report.date);
    Ok(())
}

pub async fn fetch_report(date: NaiveDate, conn: &mut SqliteConnection) -> Result<Option<ReconciliationReport>, StoreError> {
    let row: Option<ReportRow> =
        sqlx::query_as("SELECT * FROM reconciliation_reports WHERE date = $1").bind(date).fetch_optional(conn).await?;
    Ok(row.map(ReconciliationReport::from))
}
