use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::SystemTime;
use uuid::Uuid;

use crate::models::UnknownVariant;
use crate::schema::categories;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = diesel::sql_types::Text)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    Income,
    Expense,
}

impl CategoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryType::Income => "income",
            CategoryType::Expense => "expense",
        }
    }
}

impl FromStr for CategoryType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(CategoryType::Income),
            "expense" => Ok(CategoryType::Expense),
            _ => Err(UnknownVariant {
                type_name: "category type",
                value: String::from(s),
            }),
        }
    }
}

text_enum_sql!(CategoryType);

#[derive(Clone, Debug, Identifiable, Queryable)]
#[diesel(table_name = categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Category {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_by: Uuid,
    pub name: String,
    pub category_type: CategoryType,
    pub color: String,
    pub created_timestamp: SystemTime,
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name = categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewCategory<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_by: Uuid,
    pub name: &'a str,
    pub category_type: CategoryType,
    pub color: &'a str,
    pub created_timestamp: SystemTime,
}
