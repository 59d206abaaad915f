use chrono::NaiveDate;
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::aggregation::{self, MonthlySummary};
use crate::categories::{CategoryIndex, ResolvedCategory, PRIVATE_CATEGORY_ID};
use crate::db::partner::InvitationWithUser;
use crate::db::user::UserSearchResult;
use crate::models::list::List;
use crate::models::list_item::ListItem;
use crate::models::partner_invitation::InvitationStatus;
use crate::models::transaction::{RepeatType, Transaction};
use crate::models::user::{User, UserSummary};
use crate::money;

fn unix_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSession {
    pub user_id: Uuid,
    pub session_token: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub currency: String,
    pub partner_id: Option<Uuid>,
}

impl OutputUser {
    pub fn new(user: User, partner_id: Option<Uuid>) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            currency: user.currency,
            partner_id,
        }
    }
}

/// A transaction as seen by `viewer`. The description and category of a partner's private row
/// are withheld.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_by: Uuid,
    pub category_id: Uuid,
    pub category: ResolvedCategory,
    pub description: Option<String>,
    #[serde(with = "money::as_decimal")]
    pub amount: i64,
    pub date: NaiveDate,
    pub is_fixed: bool,
    pub repeat_type: Option<RepeatType>,
    pub end_date: Option<NaiveDate>,
    pub is_private: bool,
}

impl OutputTransaction {
    /// A category id that no longer resolves is reported as the unknown category so one stale
    /// row cannot break a listing.
    pub fn for_viewer(transaction: Transaction, viewer: Uuid, categories: &CategoryIndex) -> Self {
        let hidden = aggregation::is_hidden_from(&transaction, viewer);
        let category = if hidden {
            ResolvedCategory::private()
        } else {
            categories.resolve(transaction.category_id)
        };

        Self {
            id: transaction.id,
            user_id: transaction.user_id,
            created_by: transaction.created_by,
            category_id: if hidden {
                PRIVATE_CATEGORY_ID
            } else {
                transaction.category_id
            },
            category,
            description: if hidden {
                None
            } else {
                Some(transaction.description)
            },
            amount: transaction.amount_cents,
            date: transaction.date,
            is_fixed: transaction.is_fixed,
            repeat_type: transaction.repeat_type,
            end_date: transaction.end_date,
            is_private: transaction.is_private,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputDashboard {
    #[serde(flatten)]
    pub summary: MonthlySummary,
    pub month: u32,
    pub year: i32,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputListItem {
    pub id: Uuid,
    pub list_id: Uuid,
    pub created_by: Uuid,
    pub name: String,
    #[serde(with = "money::option_as_decimal")]
    pub estimated_price: Option<i64>,
    #[serde(with = "money::option_as_decimal")]
    pub actual_price: Option<i64>,
    pub category_id: Uuid,
    pub is_checked: bool,
    pub transaction_id: Option<Uuid>,
}

impl From<ListItem> for OutputListItem {
    fn from(item: ListItem) -> Self {
        Self {
            id: item.id,
            list_id: item.list_id,
            created_by: item.created_by,
            name: item.name,
            estimated_price: item.estimated_price_cents,
            actual_price: item.actual_price_cents,
            category_id: item.category_id,
            is_checked: item.is_checked,
            transaction_id: item.transaction_id,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputList {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub color: String,
    pub is_shared: bool,
    pub items: Vec<OutputListItem>,
}

impl OutputList {
    pub fn new(list: List, items: Vec<ListItem>) -> Self {
        Self {
            id: list.id,
            user_id: list.user_id,
            title: list.title,
            color: list.color,
            is_shared: list.is_shared,
            items: items.into_iter().map(OutputListItem::from).collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputReceivedInvitation {
    pub id: Uuid,
    pub token: String,
    pub from: UserSummary,
    pub expires_at: u64,
}

impl From<InvitationWithUser> for OutputReceivedInvitation {
    fn from(received: InvitationWithUser) -> Self {
        Self {
            id: received.invitation.id,
            token: received.invitation.token,
            from: received.other_user,
            expires_at: unix_millis(received.invitation.expires_at),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSentInvitation {
    pub id: Uuid,
    pub to: UserSummary,
    pub status: InvitationStatus,
    pub expires_at: u64,
}

impl From<InvitationWithUser> for OutputSentInvitation {
    fn from(sent: InvitationWithUser) -> Self {
        Self {
            id: sent.invitation.id,
            to: sent.other_user,
            status: sent.invitation.status,
            expires_at: unix_millis(sent.invitation.expires_at),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputPartnerInfo {
    pub partner: Option<UserSummary>,
    pub received_invitations: Vec<OutputReceivedInvitation>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputPartnerId {
    pub partner_id: Uuid,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputUserSearchResult {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub has_partner: bool,
}

impl From<UserSearchResult> for OutputUserSearchResult {
    fn from(result: UserSearchResult) -> Self {
        Self {
            id: result.id,
            name: result.name,
            email: result.email,
            has_partner: result.has_partner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories::{OTHER_EXPENSE_CATEGORY_ID, UNKNOWN_CATEGORY_ID};

    fn transaction(owner: Uuid, is_private: bool) -> Transaction {
        Transaction {
            id: Uuid::now_v7(),
            user_id: owner,
            created_by: owner,
            category_id: OTHER_EXPENSE_CATEGORY_ID,
            description: String::from("Birthday present"),
            amount_cents: 4_550,
            date: NaiveDate::from_ymd_opt(2025, 6, 3).unwrap(),
            is_fixed: false,
            repeat_type: Some(RepeatType::Once),
            end_date: None,
            is_private,
            created_timestamp: SystemTime::now(),
            modified_timestamp: SystemTime::now(),
        }
    }

    #[test]
    fn test_private_transaction_is_masked_for_partner_only() {
        let owner = Uuid::now_v7();
        let partner = Uuid::now_v7();

        let categories = CategoryIndex::new(Vec::new());

        let for_owner = OutputTransaction::for_viewer(transaction(owner, true), owner, &categories);
        assert_eq!(for_owner.description.as_deref(), Some("Birthday present"));
        assert_eq!(for_owner.category_id, OTHER_EXPENSE_CATEGORY_ID);
        assert_eq!(for_owner.category.id, OTHER_EXPENSE_CATEGORY_ID);

        let for_partner =
            OutputTransaction::for_viewer(transaction(owner, true), partner, &categories);
        assert_eq!(for_partner.description, None);
        assert_eq!(for_partner.category_id, PRIVATE_CATEGORY_ID);
        assert_eq!(for_partner.category.id, PRIVATE_CATEGORY_ID);
        assert_eq!(for_partner.amount, 4_550);

        let shared = OutputTransaction::for_viewer(transaction(owner, false), partner, &categories);
        assert_eq!(shared.description.as_deref(), Some("Birthday present"));
    }

    #[test]
    fn test_stale_category_reported_as_unknown() {
        let owner = Uuid::now_v7();
        let categories = CategoryIndex::new(Vec::new());

        let mut stale = transaction(owner, false);
        let deleted_category_id = Uuid::now_v7();
        stale.category_id = deleted_category_id;

        let output = OutputTransaction::for_viewer(stale, owner, &categories);
        assert_eq!(output.category_id, deleted_category_id);
        assert_eq!(output.category.id, UNKNOWN_CATEGORY_ID);
        assert_eq!(output.category.name, "categories.unknown");
        assert!(!output.category.is_custom);
    }

    #[test]
    fn test_transaction_serializes_amount_as_decimal() {
        let owner = Uuid::now_v7();
        let output = OutputTransaction::for_viewer(
            transaction(owner, false),
            owner,
            &CategoryIndex::new(Vec::new()),
        );
        let json = serde_json::to_value(&output).unwrap();

        assert_eq!(json["amount"], serde_json::json!(45.5));
        assert_eq!(json["repeatType"], serde_json::json!("once"));
        assert_eq!(json["date"], serde_json::json!("2025-06-03"));
        assert_eq!(json["isPrivate"], serde_json::json!(false));
    }

    #[test]
    fn test_dashboard_flattens_summary() {
        let dashboard = OutputDashboard {
            summary: MonthlySummary {
                balance: aggregation::Balance::default(),
                category_breakdown: Vec::new(),
            },
            month: 5,
            year: 2025,
        };

        let json = serde_json::to_value(&dashboard).unwrap();
        assert!(json["balance"]["income"].is_number());
        assert!(json["categoryBreakdown"].is_array());
        assert_eq!(json["month"], serde_json::json!(5));
    }
}
