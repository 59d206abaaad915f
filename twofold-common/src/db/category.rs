use diesel::{dsl, ExpressionMethods, OptionalExtension, QueryDsl};
use diesel_async::RunQueryDsl;
use std::time::SystemTime;
use uuid::Uuid;

use crate::categories::{is_default_category, CategoryIndex};
use crate::db::{visibility_scope, DaoError, DbAsyncPool};
use crate::models::category::{Category, CategoryType, NewCategory};

use crate::schema::categories as category_fields;
use crate::schema::categories::dsl::categories;
use crate::schema::list_items as list_item_fields;
use crate::schema::list_items::dsl::list_items;
use crate::schema::transactions as transaction_fields;
use crate::schema::transactions::dsl::transactions;

pub struct Dao {
    db_async_pool: DbAsyncPool,
}

impl Dao {
    pub fn new(db_async_pool: &DbAsyncPool) -> Self {
        Self {
            db_async_pool: db_async_pool.clone(),
        }
    }

    /// Custom categories owned by the user or by their partner.
    pub async fn get_visible_custom_categories(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Category>, DaoError> {
        let mut conn = self.db_async_pool.get().await?;
        let scope = visibility_scope(&mut conn, user_id).await?;

        Ok(categories
            .filter(category_fields::user_id.eq_any(scope))
            .order(category_fields::name.asc())
            .load::<Category>(&mut conn)
            .await?)
    }

    pub async fn get_category_index(&self, user_id: Uuid) -> Result<CategoryIndex, DaoError> {
        Ok(CategoryIndex::new(
            self.get_visible_custom_categories(user_id).await?,
        ))
    }

    /// Whether `category_id` may be referenced by a row the user writes: either a built-in
    /// category or a custom one visible to the user.
    pub async fn is_category_usable(
        &self,
        user_id: Uuid,
        category_id: Uuid,
    ) -> Result<bool, DaoError> {
        if is_default_category(category_id) {
            return Ok(true);
        }

        Ok(self
            .get_visible_custom_category(user_id, category_id)
            .await?
            .is_some())
    }

    pub async fn get_visible_custom_category(
        &self,
        user_id: Uuid,
        category_id: Uuid,
    ) -> Result<Option<Category>, DaoError> {
        let mut conn = self.db_async_pool.get().await?;
        let scope = visibility_scope(&mut conn, user_id).await?;

        Ok(categories
            .find(category_id)
            .filter(category_fields::user_id.eq_any(scope))
            .first::<Category>(&mut conn)
            .await
            .optional()?)
    }

    pub async fn create_category(
        &self,
        user_id: Uuid,
        name: &str,
        category_type: CategoryType,
        color: &str,
    ) -> Result<Category, DaoError> {
        let new_category = NewCategory {
            id: Uuid::now_v7(),
            user_id,
            created_by: user_id,
            name,
            category_type,
            color,
            created_timestamp: SystemTime::now(),
        };

        let mut conn = self.db_async_pool.get().await?;
        Ok(dsl::insert_into(categories)
            .values(&new_category)
            .get_result::<Category>(&mut conn)
            .await?)
    }

    /// Updates a category owned by `owner_id`. Callers check visibility and ownership first.
    pub async fn update_category(
        &self,
        category_id: Uuid,
        owner_id: Uuid,
        name: &str,
        category_type: CategoryType,
        color: &str,
    ) -> Result<Category, DaoError> {
        let mut conn = self.db_async_pool.get().await?;
        Ok(dsl::update(
            categories
                .find(category_id)
                .filter(category_fields::user_id.eq(owner_id)),
        )
        .set((
            category_fields::name.eq(name),
            category_fields::category_type.eq(category_type),
            category_fields::color.eq(color),
        ))
        .get_result::<Category>(&mut conn)
        .await?)
    }

    /// Deletes a category owned by `owner_id`, refusing if any transaction or list item still
    /// references it.
    pub async fn delete_category(&self, category_id: Uuid, owner_id: Uuid) -> Result<(), DaoError> {
        let mut db_connection = self.db_async_pool.get().await?;

        db_connection
            .build_transaction()
            .run::<_, DaoError, _>(|conn| {
                Box::pin(async move {
                    let used_by_transactions = dsl::select(dsl::exists(
                        transactions.filter(transaction_fields::category_id.eq(category_id)),
                    ))
                    .get_result::<bool>(conn)
                    .await?;

                    let used_by_list_items = dsl::select(dsl::exists(
                        list_items.filter(list_item_fields::category_id.eq(category_id)),
                    ))
                    .get_result::<bool>(conn)
                    .await?;

                    if used_by_transactions || used_by_list_items {
                        return Err(DaoError::CannotRunQuery("Category is in use"));
                    }

                    let deleted_row_count = diesel::delete(
                        categories
                            .find(category_id)
                            .filter(category_fields::user_id.eq(owner_id)),
                    )
                    .execute(conn)
                    .await?;

                    if deleted_row_count == 0 {
                        return Err(DaoError::QueryFailure(diesel::result::Error::NotFound));
                    }

                    Ok(())
                })
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils;

    fn dao() -> Dao {
        Dao::new(test_utils::db_async_pool())
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ignore]
    async fn test_category_lifecycle() {
        let dao = dao();
        let user_id = test_utils::insert_user().await;

        let created = dao
            .create_category(user_id, "Pets", CategoryType::Expense, "#112233")
            .await
            .unwrap();

        assert!(dao.is_category_usable(user_id, created.id).await.unwrap());

        let updated = dao
            .update_category(created.id, user_id, "Pet food", CategoryType::Expense, "#445566")
            .await
            .unwrap();
        assert_eq!(updated.name, "Pet food");

        let stranger = test_utils::insert_user().await;
        assert!(!dao.is_category_usable(stranger, created.id).await.unwrap());
        assert!(dao
            .get_visible_custom_category(stranger, created.id)
            .await
            .unwrap()
            .is_none());

        dao.delete_category(created.id, user_id).await.unwrap();
        assert!(dao
            .get_visible_custom_categories(user_id)
            .await
            .unwrap()
            .is_empty());

        test_utils::delete_user(user_id).await;
        test_utils::delete_user(stranger).await;
    }
}
