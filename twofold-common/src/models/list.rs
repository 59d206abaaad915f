use diesel::{Insertable, Queryable};
use std::time::SystemTime;
use uuid::Uuid;

use crate::schema::lists;

#[derive(Clone, Debug, Identifiable, Queryable)]
#[diesel(table_name = lists)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct List {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub color: String,
    pub is_shared: bool,
    pub created_timestamp: SystemTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = lists)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewList<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: &'a str,
    pub color: &'a str,
    pub is_shared: bool,
    pub created_timestamp: SystemTime,
}
