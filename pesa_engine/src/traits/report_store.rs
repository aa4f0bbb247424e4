use chrono::NaiveDate;

use crate::{db_types::ReconciliationReport, traits::StoreError};

#[allow(async_fn_in_trait)]
pub trait ReportStore: Clone {
    /// Stores the report, replacing any earlier report for the same date.
    async fn save_report(&self, report: &ReconciliationReport) -> Result<(), StoreError>;

    async fn fetch_report(&self, date: NaiveDate) -> Result<Option<ReconciliationReport>, StoreError>;
}
