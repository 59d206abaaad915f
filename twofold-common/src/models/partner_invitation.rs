use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::SystemTime;
use uuid::Uuid;

use crate::models::UnknownVariant;
use crate::schema::partner_invitations;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = diesel::sql_types::Text)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Declined => "declined",
            InvitationStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, InvitationStatus::Pending)
    }
}

impl FromStr for InvitationStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InvitationStatus::Pending),
            "accepted" => Ok(InvitationStatus::Accepted),
            "declined" => Ok(InvitationStatus::Declined),
            "expired" => Ok(InvitationStatus::Expired),
            _ => Err(UnknownVariant {
                type_name: "invitation status",
                value: String::from(s),
            }),
        }
    }
}

text_enum_sql!(InvitationStatus);

#[derive(Clone, Debug, Identifiable, Queryable)]
#[diesel(table_name = partner_invitations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PartnerInvitation {
    pub id: Uuid,
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    pub status: InvitationStatus,
    pub token: String,
    pub created_timestamp: SystemTime,
    pub expires_at: SystemTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = partner_invitations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewPartnerInvitation<'a> {
    pub id: Uuid,
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    pub status: InvitationStatus,
    pub token: &'a str,
    pub created_timestamp: SystemTime,
    pub expires_at: SystemTime,
}
