use std::time::Duration;

use chrono::{Days, Utc};
use log::*;
use pesa_engine::{ReconciliationApi, SqliteDatabase};
use tokio::task::JoinHandle;

/// Starts the reconciliation worker, which reconciles the previous (UTC) day once every `interval`, starting straight
/// away. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_reconcile_worker(api: ReconciliationApi<SqliteDatabase>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval.max(Duration::from_secs(60)));
        info!("🕰️ Reconciliation worker started");
        loop {
            timer.tick().await;
            let Some(yesterday) = Utc::now().date_naive().checked_sub_days(Days::new(1)) else {
                continue;
            };
            info!("🕰️ Running scheduled reconciliation for {yesterday}");
            match api.reconcile(yesterday).await {
                Ok(report) => info!(
                    "🕰️ Reconciliation for {yesterday} done. {} payments, {} matched, {} unmatched",
                    report.total_payments, report.matched_count, report.unmatched_count
                ),
                Err(e) => error!("🕰️ Scheduled reconciliation for {yesterday} failed: {e}"),
            }
        }
    })
}
