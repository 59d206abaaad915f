use chrono::NaiveDate;
use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::SystemTime;
use uuid::Uuid;

use crate::models::UnknownVariant;
use crate::schema::transactions;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = diesel::sql_types::Text)]
pub enum RepeatType {
    #[serde(rename = "once")]
    Once,
    #[serde(rename = "forever")]
    Forever,
    #[serde(rename = "3months")]
    ThreeMonths,
    #[serde(rename = "4months")]
    FourMonths,
    #[serde(rename = "6months")]
    SixMonths,
    #[serde(rename = "12months")]
    TwelveMonths,
    #[serde(rename = "annual")]
    Annual,
    #[serde(rename = "until")]
    Until,
}

impl RepeatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatType::Once => "once",
            RepeatType::Forever => "forever",
            RepeatType::ThreeMonths => "3months",
            RepeatType::FourMonths => "4months",
            RepeatType::SixMonths => "6months",
            RepeatType::TwelveMonths => "12months",
            RepeatType::Annual => "annual",
            RepeatType::Until => "until",
        }
    }

    /// Number of monthly occurrences for the limited-duration types, counting the template's
    /// own month.
    pub fn limited_months(&self) -> Option<u32> {
        match self {
            RepeatType::ThreeMonths => Some(3),
            RepeatType::FourMonths => Some(4),
            RepeatType::SixMonths => Some(6),
            RepeatType::TwelveMonths => Some(12),
            _ => None,
        }
    }

    pub fn is_monthly(&self) -> bool {
        matches!(
            self,
            RepeatType::Forever
                | RepeatType::ThreeMonths
                | RepeatType::FourMonths
                | RepeatType::SixMonths
                | RepeatType::TwelveMonths
                | RepeatType::Until
        )
    }
}

impl FromStr for RepeatType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "once" => Ok(RepeatType::Once),
            "forever" => Ok(RepeatType::Forever),
            "3months" => Ok(RepeatType::ThreeMonths),
            "4months" => Ok(RepeatType::FourMonths),
            "6months" => Ok(RepeatType::SixMonths),
            "12months" => Ok(RepeatType::TwelveMonths),
            "annual" => Ok(RepeatType::Annual),
            "until" => Ok(RepeatType::Until),
            _ => Err(UnknownVariant {
                type_name: "repeat type",
                value: String::from(s),
            }),
        }
    }
}

text_enum_sql!(RepeatType);

#[derive(Clone, Debug, PartialEq, Eq, Identifiable, Queryable)]
#[diesel(table_name = transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_by: Uuid,

    pub category_id: Uuid,
    pub description: String,
    pub amount_cents: i64,
    pub date: NaiveDate,

    pub is_fixed: bool,
    pub repeat_type: Option<RepeatType>,
    pub end_date: Option<NaiveDate>,

    pub is_private: bool,

    pub created_timestamp: SystemTime,
    pub modified_timestamp: SystemTime,
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name = transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewTransaction<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_by: Uuid,

    pub category_id: Uuid,
    pub description: &'a str,
    pub amount_cents: i64,
    pub date: NaiveDate,

    pub is_fixed: bool,
    pub repeat_type: Option<RepeatType>,
    pub end_date: Option<NaiveDate>,

    pub is_private: bool,

    pub created_timestamp: SystemTime,
    pub modified_timestamp: SystemTime,
}
