use chrono::NaiveDate;
use diesel::{dsl, BoolExpressionMethods, ExpressionMethods, OptionalExtension, QueryDsl};
use diesel_async::RunQueryDsl;
use std::time::SystemTime;
use uuid::Uuid;

use crate::aggregation;
use crate::db::{visibility_scope, DaoError, DbAsyncPool};
use crate::models::transaction::{NewTransaction, RepeatType, Transaction};

use crate::schema::transactions as transaction_fields;
use crate::schema::transactions::dsl::transactions;

/// Fields a caller may set on a transaction. Ownership fields are fixed at creation.
#[derive(Clone, Debug)]
pub struct TransactionFields<'a> {
    pub category_id: Uuid,
    pub description: &'a str,
    pub amount_cents: i64,
    pub date: NaiveDate,
    pub is_fixed: bool,
    pub repeat_type: Option<RepeatType>,
    pub end_date: Option<NaiveDate>,
    pub is_private: bool,
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

    /// Transactions belonging to or recorded by the user or their partner that make up the given
    /// month (0-indexed).
    /// Annual rows show up in their renewal month whatever year they are stored under.
    pub async fn get_transactions_for_month(
        &self,
        user_id: Uuid,
        year: i32,
        month0: u32,
    ) -> Result<Vec<Transaction>, DaoError> {
        let Some((first_day, last_day)) = aggregation::month_bounds(year, month0) else {
            return Err(DaoError::WontRunQuery);
        };

        let mut conn = self.db_async_pool.get().await?;
        let scope = visibility_scope(&mut conn, user_id).await?;

        let mut in_month = transactions
            .filter(
                transaction_fields::user_id
                    .eq_any(scope.clone())
                    .or(transaction_fields::created_by.eq_any(scope.clone())),
            )
            .filter(transaction_fields::date.between(first_day, last_day))
            .filter(
                transaction_fields::repeat_type
                    .ne(RepeatType::Annual)
                    .or(transaction_fields::repeat_type.is_null()),
            )
            .load::<Transaction>(&mut conn)
            .await?;

        let annual = transactions
            .filter(
                transaction_fields::user_id
                    .eq_any(scope.clone())
                    .or(transaction_fields::created_by.eq_any(scope)),
            )
            .filter(transaction_fields::repeat_type.eq(RepeatType::Annual))
            .load::<Transaction>(&mut conn)
            .await?;

        in_month.extend(
            annual
                .into_iter()
                .filter(|t| aggregation::in_monthly_set(t, year, month0)),
        );

        in_month.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));

        Ok(in_month)
    }

    pub async fn get_annual_transactions(&self, user_id: Uuid) -> Result<Vec<Transaction>, DaoError> {
        let mut conn = self.db_async_pool.get().await?;
        let scope = visibility_scope(&mut conn, user_id).await?;

        Ok(transactions
            .filter(
                transaction_fields::user_id
                    .eq_any(scope.clone())
                    .or(transaction_fields::created_by.eq_any(scope)),
            )
            .filter(transaction_fields::repeat_type.eq(RepeatType::Annual))
            .order(transaction_fields::date.asc())
            .load::<Transaction>(&mut conn)
            .await?)
    }

    /// A transaction the user can see: their own, or one belonging to or created by their
    /// partner.
    pub async fn get_visible_transaction(
        &self,
        user_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<Option<Transaction>, DaoError> {
        let mut conn = self.db_async_pool.get().await?;
        let scope = visibility_scope(&mut conn, user_id).await?;

        Ok(transactions
            .find(transaction_id)
            .filter(
                transaction_fields::user_id
                    .eq_any(scope.clone())
                    .or(transaction_fields::created_by.eq_any(scope)),
            )
            .first::<Transaction>(&mut conn)
            .await
            .optional()?)
    }

    pub async fn create_transaction(
        &self,
        owner_id: Uuid,
        created_by: Uuid,
        fields: &TransactionFields<'_>,
    ) -> Result<Transaction, DaoError> {
        let current_time = SystemTime::now();

        let new_transaction = NewTransaction {
            id: Uuid::now_v7(),
            user_id: owner_id,
            created_by,
            category_id: fields.category_id,
            description: fields.description,
            amount_cents: fields.amount_cents,
            date: fields.date,
            is_fixed: fields.is_fixed,
            repeat_type: fields.repeat_type,
            end_date: fields.end_date,
            is_private: fields.is_private,
            created_timestamp: current_time,
            modified_timestamp: current_time,
        };

        let mut conn = self.db_async_pool.get().await?;
        Ok(dsl::insert_into(transactions)
            .values(&new_transaction)
            .get_result::<Transaction>(&mut conn)
            .await?)
    }

    /// Only the user who recorded a transaction may change it.
    pub async fn update_transaction(
        &self,
        transaction_id: Uuid,
        created_by: Uuid,
        fields: &TransactionFields<'_>,
    ) -> Result<Transaction, DaoError> {
        let mut conn = self.db_async_pool.get().await?;
        Ok(dsl::update(
            transactions
                .find(transaction_id)
                .filter(transaction_fields::created_by.eq(created_by)),
        )
        .set((
            transaction_fields::category_id.eq(fields.category_id),
            transaction_fields::description.eq(fields.description),
            transaction_fields::amount_cents.eq(fields.amount_cents),
            transaction_fields::date.eq(fields.date),
            transaction_fields::is_fixed.eq(fields.is_fixed),
            transaction_fields::repeat_type.eq(fields.repeat_type),
            transaction_fields::end_date.eq(fields.end_date),
            transaction_fields::is_private.eq(fields.is_private),
            transaction_fields::modified_timestamp.eq(SystemTime::now()),
        ))
        .get_result::<Transaction>(&mut conn)
        .await?)
    }

    pub async fn delete_transaction(
        &self,
        transaction_id: Uuid,
        created_by: Uuid,
    ) -> Result<(), DaoError> {
        let mut conn = self.db_async_pool.get().await?;
        let deleted_row_count = diesel::delete(
            transactions
                .find(transaction_id)
                .filter(transaction_fields::created_by.eq(created_by)),
        )
        .execute(&mut conn)
        .await?;

        if deleted_row_count == 0 {
            return Err(DaoError::QueryFailure(diesel::result::Error::NotFound));
        }

        Ok(())
    }
}
