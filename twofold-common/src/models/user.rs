use diesel::{Insertable, Queryable};
use serde::Serialize;
use std::time::SystemTime;
use uuid::Uuid;

use crate::schema::users;

pub const DEFAULT_CURRENCY: &str = "EUR";

#[derive(Clone, Debug, Identifiable, Queryable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub currency: String,
    pub password_hash: String,
    pub created_timestamp: SystemTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewUser<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub email: &'a str,
    pub currency: &'a str,
    pub password_hash: &'a str,
    pub created_timestamp: SystemTime,
}

/// The public part of a user, safe to show to a partner or in search results.
#[derive(Clone, Debug, PartialEq, Eq, Queryable, Serialize)]
#[serde(rename_all = "camelCase")]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub currency: String,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            currency: user.currency,
        }
    }
}
