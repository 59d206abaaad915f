use twofold_common::db::recurring::Dao as RecurringDao;
use twofold_common::db::DbAsyncPool;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use crate::jobs::{Job, JobError};

/// Copies active monthly templates into this month and rolls annual rows forward. The DAO only
/// acts on the first of the month and skips occurrences that already exist, so running the job
/// several times a day is harmless.
pub struct MaterializeRecurringTransactionsJob {
    db_async_pool: DbAsyncPool,
    is_running: bool,
}

impl MaterializeRecurringTransactionsJob {
    pub fn new(db_async_pool: DbAsyncPool) -> Self {
        Self {
            db_async_pool,
            is_running: false,
        }
    }

    async fn materialize_for(&self, today: NaiveDate) -> Result<(), JobError> {
        let dao = RecurringDao::new(&self.db_async_pool);
        let report = dao.materialize(today).await?;

        if report.created_count > 0 || report.annual_updated_count > 0 {
            log::info!(
                "Materialized recurring transactions for {today}: {} created, {} annual updated, \
                 {} skipped",
                report.created_count,
                report.annual_updated_count,
                report.skipped_count,
            );
        }

        Ok(())
    }
}

#[async_trait]
impl Job for MaterializeRecurringTransactionsJob {
    fn name(&self) -> &'static str {
        "Materialize Recurring Transactions"
    }

    fn is_ready(&self) -> bool {
        !self.is_running
    }

    async fn execute(&mut self) -> Result<(), JobError> {
        self.is_running = true;
        let result = self.materialize_for(Utc::now().date_naive()).await;
        self.is_running = false;

        result
    }
}
