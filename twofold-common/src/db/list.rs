use chrono::NaiveDate;
use diesel::{dsl, BelongingToDsl, BoolExpressionMethods, ExpressionMethods, GroupedBy};
use diesel::{OptionalExtension, QueryDsl};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use std::time::SystemTime;
use uuid::Uuid;

use crate::db::{find_partner_id, DaoError, DbAsyncPool};
use crate::models::list::{List, NewList};
use crate::models::list_item::{ListItem, NewListItem};
use crate::models::transaction::{NewTransaction, RepeatType};

use crate::schema::list_items as list_item_fields;
use crate::schema::list_items::dsl::list_items;
use crate::schema::lists as list_fields;
use crate::schema::lists::dsl::lists;
use crate::schema::transactions as transaction_fields;
use crate::schema::transactions::dsl::transactions;

#[derive(Clone, Debug)]
pub struct ListItemFields<'a> {
    pub name: &'a str,
    pub estimated_price_cents: Option<i64>,
    pub actual_price_cents: Option<i64>,
    pub category_id: Uuid,
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

    /// The user's own lists plus the lists their partner shares, each with its items.
    pub async fn get_visible_lists(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<(List, Vec<ListItem>)>, DaoError> {
        let mut conn = self.db_async_pool.get().await?;
        let partner_id = find_partner_id(&mut conn, user_id).await?;

        let loaded_lists = match partner_id {
            Some(partner_id) => {
                lists
                    .filter(
                        list_fields::user_id.eq(user_id).or(list_fields::user_id
                            .eq(partner_id)
                            .and(list_fields::is_shared.eq(true))),
                    )
                    .order(list_fields::created_timestamp.desc())
                    .load::<List>(&mut conn)
                    .await?
            }
            None => {
                lists
                    .filter(list_fields::user_id.eq(user_id))
                    .order(list_fields::created_timestamp.desc())
                    .load::<List>(&mut conn)
                    .await?
            }
        };

        let loaded_items = ListItem::belonging_to(&loaded_lists)
            .order(list_item_fields::created_timestamp.asc())
            .load::<ListItem>(&mut conn)
            .await?
            .grouped_by(&loaded_lists);

        Ok(loaded_lists.into_iter().zip(loaded_items).collect())
    }

    pub async fn get_visible_list(
        &self,
        user_id: Uuid,
        list_id: Uuid,
    ) -> Result<Option<(List, Vec<ListItem>)>, DaoError> {
        let mut conn = self.db_async_pool.get().await?;

        let Some(list) = find_visible_list(&mut conn, user_id, list_id).await? else {
            return Ok(None);
        };

        let items = ListItem::belonging_to(&list)
            .order(list_item_fields::created_timestamp.asc())
            .load::<ListItem>(&mut conn)
            .await?;

        Ok(Some((list, items)))
    }

    pub async fn create_list(
        &self,
        user_id: Uuid,
        title: &str,
        color: &str,
        is_shared: bool,
    ) -> Result<List, DaoError> {
        let new_list = NewList {
            id: Uuid::now_v7(),
            user_id,
            title,
            color,
            is_shared,
            created_timestamp: SystemTime::now(),
        };

        let mut conn = self.db_async_pool.get().await?;
        Ok(dsl::insert_into(lists)
            .values(&new_list)
            .get_result::<List>(&mut conn)
            .await?)
    }

    pub async fn update_list(
        &self,
        list_id: Uuid,
        owner_id: Uuid,
        title: &str,
        color: &str,
        is_shared: bool,
    ) -> Result<List, DaoError> {
        let mut conn = self.db_async_pool.get().await?;
        Ok(
            dsl::update(lists.find(list_id).filter(list_fields::user_id.eq(owner_id)))
                .set((
                    list_fields::title.eq(title),
                    list_fields::color.eq(color),
                    list_fields::is_shared.eq(is_shared),
                ))
                .get_result::<List>(&mut conn)
                .await?,
        )
    }

    /// Deletes a list and its items. Transactions created by checking items are kept.
    pub async fn delete_list(&self, list_id: Uuid, owner_id: Uuid) -> Result<(), DaoError> {
        let mut conn = self.db_async_pool.get().await?;
        let deleted_row_count =
            diesel::delete(lists.find(list_id).filter(list_fields::user_id.eq(owner_id)))
                .execute(&mut conn)
                .await?;

        if deleted_row_count == 0 {
            return Err(DaoError::QueryFailure(diesel::result::Error::NotFound));
        }

        Ok(())
    }

    pub async fn add_item(
        &self,
        list_id: Uuid,
        created_by: Uuid,
        fields: &ListItemFields<'_>,
    ) -> Result<ListItem, DaoError> {
        let new_item = NewListItem {
            id: Uuid::now_v7(),
            list_id,
            created_by,
            name: fields.name,
            estimated_price_cents: fields.estimated_price_cents,
            actual_price_cents: fields.actual_price_cents,
            category_id: fields.category_id,
            is_checked: false,
            transaction_id: None,
            created_timestamp: SystemTime::now(),
        };

        let mut conn = self.db_async_pool.get().await?;
        Ok(dsl::insert_into(list_items)
            .values(&new_item)
            .get_result::<ListItem>(&mut conn)
            .await?)
    }

    /// Updates an item. If the item is checked, the transaction it produced follows the new
    /// name, category and price.
    pub async fn update_item(
        &self,
        list_id: Uuid,
        item_id: Uuid,
        fields: &ListItemFields<'_>,
    ) -> Result<ListItem, DaoError> {
        let mut db_connection = self.db_async_pool.get().await?;

        db_connection
            .build_transaction()
            .run::<_, DaoError, _>(|conn| {
                Box::pin(async move {
                    let item = dsl::update(
                        list_items
                            .find(item_id)
                            .filter(list_item_fields::list_id.eq(list_id)),
                    )
                    .set((
                        list_item_fields::name.eq(fields.name),
                        list_item_fields::estimated_price_cents.eq(fields.estimated_price_cents),
                        list_item_fields::actual_price_cents.eq(fields.actual_price_cents),
                        list_item_fields::category_id.eq(fields.category_id),
                    ))
                    .get_result::<ListItem>(conn)
                    .await?;

                    if let (Some(transaction_id), Some(price_cents)) =
                        (item.transaction_id, item.effective_price_cents())
                    {
                        dsl::update(transactions.find(transaction_id))
                            .set((
                                transaction_fields::description.eq(&item.name),
                                transaction_fields::category_id.eq(item.category_id),
                                transaction_fields::amount_cents.eq(price_cents),
                                transaction_fields::modified_timestamp.eq(SystemTime::now()),
                            ))
                            .execute(conn)
                            .await?;
                    }

                    Ok(item)
                })
            })
            .await
    }

    /// Deletes an item. A transaction it produced is kept.
    pub async fn delete_item(&self, list_id: Uuid, item_id: Uuid) -> Result<(), DaoError> {
        let mut conn = self.db_async_pool.get().await?;
        let deleted_row_count = diesel::delete(
            list_items
                .find(item_id)
                .filter(list_item_fields::list_id.eq(list_id)),
        )
        .execute(&mut conn)
        .await?;

        if deleted_row_count == 0 {
            return Err(DaoError::QueryFailure(diesel::result::Error::NotFound));
        }

        Ok(())
    }

    /// Checks or unchecks an item; `None` toggles it. Checking a priced item books a transaction
    /// under the list owner, dated `today` and recorded as created by `actor`. Unchecking
    /// deletes that transaction. The item and the transaction change together or not at all.
    pub async fn set_item_checked(
        &self,
        actor: Uuid,
        list_id: Uuid,
        item_id: Uuid,
        checked: Option<bool>,
        today: NaiveDate,
    ) -> Result<ListItem, DaoError> {
        let mut db_connection = self.db_async_pool.get().await?;

        db_connection
            .build_transaction()
            .run::<_, DaoError, _>(|conn| {
                Box::pin(async move {
                    let list_owner_id = lists
                        .select(list_fields::user_id)
                        .find(list_id)
                        .first::<Uuid>(conn)
                        .await?;

                    let item = list_items
                        .find(item_id)
                        .filter(list_item_fields::list_id.eq(list_id))
                        .for_update()
                        .first::<ListItem>(conn)
                        .await?;

                    let target = checked.unwrap_or(!item.is_checked);
                    if target == item.is_checked {
                        return Ok(item);
                    }

                    let transaction_id = if target {
                        match item.effective_price_cents() {
                            Some(price_cents) => {
                                let current_time = SystemTime::now();
                                let new_transaction = NewTransaction {
                                    id: Uuid::now_v7(),
                                    user_id: list_owner_id,
                                    created_by: actor,
                                    category_id: item.category_id,
                                    description: &item.name,
                                    amount_cents: price_cents,
                                    date: today,
                                    is_fixed: false,
                                    repeat_type: Some(RepeatType::Once),
                                    end_date: None,
                                    is_private: false,
                                    created_timestamp: current_time,
                                    modified_timestamp: current_time,
                                };

                                dsl::insert_into(transactions)
                                    .values(&new_transaction)
                                    .execute(conn)
                                    .await?;

                                Some(new_transaction.id)
                            }
                            None => None,
                        }
                    } else {
                        if let Some(linked_id) = item.transaction_id {
                            diesel::delete(transactions.find(linked_id))
                                .execute(conn)
                                .await?;
                        }

                        None
                    };

                    Ok(dsl::update(list_items.find(item_id))
                        .set((
                            list_item_fields::is_checked.eq(target),
                            list_item_fields::transaction_id.eq(transaction_id),
                        ))
                        .get_result::<ListItem>(conn)
                        .await?)
                })
            })
            .await
    }
}

async fn find_visible_list(
    conn: &mut AsyncPgConnection,
    user_id: Uuid,
    list_id: Uuid,
) -> Result<Option<List>, DaoError> {
    let Some(list) = lists
        .find(list_id)
        .first::<List>(conn)
        .await
        .optional()?
    else {
        return Ok(None);
    };

    if list.user_id == user_id {
        return Ok(Some(list));
    }

    if list.is_shared && find_partner_id(conn, user_id).await? == Some(list.user_id) {
        return Ok(Some(list));
    }

    Ok(None)
}
