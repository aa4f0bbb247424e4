use std::{
    collections::{HashMap, HashSet},
    fmt::Debug,
    sync::{Arc, Mutex},
};

use chrono::{Days, NaiveDate, NaiveTime, TimeZone, Utc};
use log::*;

use super::errors::ReconciliationError;
use crate::{
    db_types::{Order, ReconciliationEntry, ReconciliationReport},
    traits::{OrderStore, PaymentStore, ReportStore},
};

/// Matches a day's completed payments against the orders created for them.
///
/// Clones share the set of dates being reconciled, so the HTTP trigger and the scheduled worker cannot run the same
/// date at the same time.
#[derive(Clone)]
pub struct ReconciliationApi<B> {
    db: B,
    running: Arc<Mutex<HashSet<NaiveDate>>>,
}

impl<B> Debug for ReconciliationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi")
    }
}

/// Releases the date when the run finishes, including when it fails.
struct RunGuard {
    date: NaiveDate,
    running: Arc<Mutex<HashSet<NaiveDate>>>,
}

impl RunGuard {
    fn acquire(date: NaiveDate, running: &Arc<Mutex<HashSet<NaiveDate>>>) -> Option<Self> {
        let mut dates = running.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        dates.insert(date).then(|| Self { date, running: Arc::clone(running) })
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let mut dates = self.running.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        dates.remove(&self.date);
    }
}

impl<B> ReconciliationApi<B> {
    pub fn new(db: B) -> Self {
        Self { db, running: Arc::new(Mutex::new(HashSet::new())) }
    }
}

impl<B> ReconciliationApi<B>
where B: PaymentStore + OrderStore + ReportStore
{
    /// Builds and stores the report for `date` (UTC), replacing any earlier report for the same day.
    pub async fn reconcile(&self, date: NaiveDate) -> Result<ReconciliationReport, ReconciliationError> {
        let Some(_guard) = RunGuard::acquire(date, &self.running) else {
            warn!("🔄️🧾️ Reconciliation for {date} is already running");
            return Err(ReconciliationError::InProgress(date));
        };
        let start = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
        let end = start + Days::new(1);
        let payments = self.db.completed_payments_between(start, end).await?;
        let refs = payments.iter().map(|p| p.id.clone()).collect::<Vec<String>>();
        let orders = self.db.orders_for_payment_refs(&refs).await?;
        let mut by_payment = orders
            .into_iter()
            .filter_map(|o| o.payment_ref.clone().map(|r| (r, o)))
            .collect::<HashMap<String, Order>>();
        let entries = payments
            .into_iter()
            .map(|p| {
                let order = by_payment.remove(&p.id);
                ReconciliationEntry {
                    matched: order.is_some(),
                    order_ref: order.map(|o| o.order_ref),
                    payment_ref: p.id,
                    amount: p.amount,
                    receipt_ref: p.receipt_ref,
                }
            })
            .collect::<Vec<_>>();
        let report = ReconciliationReport::new(date, entries);
        for entry in report.unmatched() {
            warn!(
                "🔄️🧾️ Completed payment [{}] of {} (receipt {}) on {date} has no order",
                entry.payment_ref,
                entry.amount,
                entry.receipt_ref.as_deref().unwrap_or("none")
            );
        }
        self.db.save_report(&report).await?;
        info!(
            "🔄️🧾️ Reconciled {date}: {} payments, {} matched, {} unmatched",
            report.total_payments, report.matched_count, report.unmatched_count
        );
        Ok(report)
    }

    pub async fn stored_report(&self, date: NaiveDate) -> Result<Option<ReconciliationReport>, ReconciliationError> {
        Ok(self.db.fetch_report(date).await?)
    }
}
