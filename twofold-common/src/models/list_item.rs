use diesel::{Insertable, Queryable};
use std::time::SystemTime;
use uuid::Uuid;

use crate::models::list::List;
use crate::schema::list_items;

#[derive(Clone, Debug, Associations, Identifiable, Queryable)]
#[diesel(belongs_to(List, foreign_key = list_id))]
#[diesel(table_name = list_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ListItem {
    pub id: Uuid,
    pub list_id: Uuid,
    pub created_by: Uuid,

    pub name: String,
    pub estimated_price_cents: Option<i64>,
    pub actual_price_cents: Option<i64>,
    pub category_id: Uuid,

    pub is_checked: bool,
    pub transaction_id: Option<Uuid>,

    pub created_timestamp: SystemTime,
}

impl ListItem {
    /// The price a checked item is booked at. What was actually paid wins over the estimate.
    pub fn effective_price_cents(&self) -> Option<i64> {
        self.actual_price_cents.or(self.estimated_price_cents)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = list_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewListItem<'a> {
    pub id: Uuid,
    pub list_id: Uuid,
    pub created_by: Uuid,

    pub name: &'a str,
    pub estimated_price_cents: Option<i64>,
    pub actual_price_cents: Option<i64>,
    pub category_id: Uuid,

    pub is_checked: bool,
    pub transaction_id: Option<Uuid>,

    pub created_timestamp: SystemTime,
}
