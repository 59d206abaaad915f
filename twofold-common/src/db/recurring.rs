use chrono::{Datelike, NaiveDate};
use diesel::{dsl, BoolExpressionMethods, ExpressionMethods, QueryDsl};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;
use std::time::SystemTime;
use uuid::Uuid;

use crate::db::{DaoError, DbAsyncPool};
use crate::models::transaction::{NewTransaction, RepeatType, Transaction};
use crate::recurrence;

use crate::schema::transactions as transaction_fields;
use crate::schema::transactions::dsl::transactions;

const MONTHLY_REPEAT_TYPES: [RepeatType; 6] = [
    RepeatType::Forever,
    RepeatType::ThreeMonths,
    RepeatType::FourMonths,
    RepeatType::SixMonths,
    RepeatType::TwelveMonths,
    RepeatType::Until,
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterializeReport {
    pub created_count: u32,
    pub annual_updated_count: u32,
    pub skipped_count: u32,
}

pub struct Dao {
    db_async_pool: DbAsyncPool,
}

impl Dao {
    pub fn new(db_async_pool: &DbAsyncPool) -> Self {
        Self {
            db_async_pool: db_async_pool.clone(),
        }
    }

    /// Creates this month's occurrence of every active monthly template and rolls annual rows
    /// forward. Does nothing unless `today` is the first of the month.
    ///
    /// Rows are written one at a time with no surrounding transaction. Every insert is preceded
    /// by an existence check, so a run that fails partway through can simply be repeated.
    pub async fn materialize(&self, today: NaiveDate) -> Result<MaterializeReport, DaoError> {
        let mut report = MaterializeReport::default();

        if !recurrence::should_run_today(today) {
            return Ok(report);
        }

        let Some(first_of_month) = recurrence::first_day_of_month(today.year(), today.month())
        else {
            return Err(DaoError::WontRunQuery);
        };

        let mut conn = self.db_async_pool.get().await?;

        let templates = transactions
            .filter(transaction_fields::is_fixed.eq(true))
            .filter(
                transaction_fields::repeat_type
                    .eq_any(MONTHLY_REPEAT_TYPES)
                    .or(transaction_fields::repeat_type.is_null()),
            )
            .filter(
                transaction_fields::end_date
                    .is_null()
                    .or(transaction_fields::end_date.ge(first_of_month)),
            )
            .load::<Transaction>(&mut conn)
            .await?;

        for template in templates.iter() {
            if !recurrence::template_is_active(template, today) {
                report.skipped_count += 1;
                continue;
            }

            let Some(occurrence_date) = recurrence::occurrence_date(template.date, today) else {
                log::debug!("No occurrence of recurring transaction {} for {today}", template.id);
                report.skipped_count += 1;
                continue;
            };

            if occurrence_exists(&mut conn, template, occurrence_date).await? {
                report.skipped_count += 1;
                continue;
            }

            let current_time = SystemTime::now();
            let occurrence = NewTransaction {
                id: Uuid::now_v7(),
                user_id: template.user_id,
                created_by: template.created_by,
                category_id: template.category_id,
                description: &template.description,
                amount_cents: template.amount_cents,
                date: occurrence_date,
                is_fixed: false,
                repeat_type: Some(RepeatType::Once),
                end_date: None,
                is_private: template.is_private,
                created_timestamp: current_time,
                modified_timestamp: current_time,
            };

            dsl::insert_into(transactions)
                .values(&occurrence)
                .execute(&mut conn)
                .await?;

            report.created_count += 1;
        }

        let annual_rows = transactions
            .select((transaction_fields::id, transaction_fields::date))
            .filter(transaction_fields::repeat_type.eq(RepeatType::Annual))
            .load::<(Uuid, NaiveDate)>(&mut conn)
            .await?;

        for (transaction_id, stored_date) in annual_rows {
            let Some(next_date) = recurrence::annual_rollover_date(stored_date, today) else {
                continue;
            };

            // Guarded on the old date so that a concurrent run does not roll a row twice
            let updated_row_count = dsl::update(
                transactions
                    .find(transaction_id)
                    .filter(transaction_fields::date.eq(stored_date)),
            )
            .set((
                transaction_fields::date.eq(next_date),
                transaction_fields::modified_timestamp.eq(SystemTime::now()),
            ))
            .execute(&mut conn)
            .await?;

            report.annual_updated_count += updated_row_count as u32;
        }

        Ok(report)
    }
}

/// Whether this month's occurrence of `template` is already recorded. The template itself counts
/// when it is dated on the occurrence day.
async fn occurrence_exists(
    conn: &mut AsyncPgConnection,
    template: &Transaction,
    occurrence_date: NaiveDate,
) -> Result<bool, DaoError> {
    Ok(dsl::select(dsl::exists(
        transactions
            .filter(transaction_fields::user_id.eq(template.user_id))
            .filter(transaction_fields::category_id.eq(template.category_id))
            .filter(transaction_fields::description.eq(&template.description))
            .filter(transaction_fields::amount_cents.eq(template.amount_cents))
            .filter(transaction_fields::date.eq(occurrence_date)),
    ))
    .get_result::<bool>(conn)
    .await?)
}
