use diesel::{Insertable, Queryable};
use std::time::SystemTime;
use uuid::Uuid;

use crate::schema::{partnership_members, partnerships};

#[derive(Clone, Debug, Identifiable, Queryable)]
#[diesel(table_name = partnerships)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Partnership {
    pub id: Uuid,
    pub user_a_id: Uuid,
    pub user_b_id: Uuid,
    pub created_timestamp: SystemTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = partnerships)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewPartnership {
    pub id: Uuid,
    pub user_a_id: Uuid,
    pub user_b_id: Uuid,
    pub created_timestamp: SystemTime,
}

impl NewPartnership {
    /// Orders the pair so that `user_a_id < user_b_id`, which the table's uniqueness constraint
    /// relies on.
    pub fn for_pair(first: Uuid, second: Uuid, created_timestamp: SystemTime) -> Self {
        let (user_a_id, user_b_id) = if first < second {
            (first, second)
        } else {
            (second, first)
        };

        Self {
            id: Uuid::now_v7(),
            user_a_id,
            user_b_id,
            created_timestamp,
        }
    }
}

#[derive(Clone, Debug, Identifiable, Queryable)]
#[diesel(table_name = partnership_members, primary_key(user_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PartnershipMember {
    pub user_id: Uuid,
    pub partnership_id: Uuid,
    pub partner_id: Uuid,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = partnership_members)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewPartnershipMember {
    pub user_id: Uuid,
    pub partnership_id: Uuid,
    pub partner_id: Uuid,
}
