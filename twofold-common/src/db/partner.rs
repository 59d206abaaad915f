use diesel::{dsl, BoolExpressionMethods, ExpressionMethods, JoinOnDsl, OptionalExtension, QueryDsl};
use diesel_async::RunQueryDsl;
use std::time::SystemTime;
use uuid::Uuid;

use crate::db::{find_partner_id, is_unique_violation, DaoError, DbAsyncPool};
use crate::models::partner_invitation::{
    InvitationStatus, NewPartnerInvitation, PartnerInvitation,
};
use crate::models::partnership::{NewPartnership, NewPartnershipMember};
use crate::models::user::UserSummary;
use crate::partner::{
    check_invite, check_transition, generate_invitation_token, invitation_expiry, Party,
    PartnerError, TransitionCheck,
};

use crate::schema::partner_invitations as invitation_fields;
use crate::schema::partner_invitations::dsl::partner_invitations;
use crate::schema::partnership_members as partnership_member_fields;
use crate::schema::partnership_members::dsl::partnership_members;
use crate::schema::partnerships::dsl::partnerships;
use crate::schema::users as user_fields;
use crate::schema::users::dsl::users;

/// An invitation together with the user on the other end of it.
#[derive(Clone, Debug)]
pub struct InvitationWithUser {
    pub invitation: PartnerInvitation,
    pub other_user: UserSummary,
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

    pub async fn get_partner_id(&self, user_id: Uuid) -> Result<Option<Uuid>, DaoError> {
        let mut conn = self.db_async_pool.get().await?;
        Ok(find_partner_id(&mut conn, user_id).await?)
    }

    pub async fn get_partner(&self, user_id: Uuid) -> Result<Option<UserSummary>, DaoError> {
        let mut conn = self.db_async_pool.get().await?;
        Ok(partnership_members
            .inner_join(users.on(user_fields::id.eq(partnership_member_fields::partner_id)))
            .select((
                user_fields::id,
                user_fields::name,
                user_fields::email,
                user_fields::currency,
            ))
            .filter(partnership_member_fields::user_id.eq(user_id))
            .first::<UserSummary>(&mut conn)
            .await
            .optional()?)
    }

    pub async fn invite(
        &self,
        from_user_id: Uuid,
        to_user_id: Uuid,
        now: SystemTime,
    ) -> Result<PartnerInvitation, PartnerError> {
        let token = generate_invitation_token();
        let new_invitation = NewPartnerInvitation {
            id: Uuid::now_v7(),
            from_user_id,
            to_user_id,
            status: InvitationStatus::Pending,
            token: &token,
            created_timestamp: now,
            expires_at: invitation_expiry(now),
        };

        let mut db_connection = self.db_async_pool.get().await?;

        db_connection
            .build_transaction()
            .run::<_, PartnerError, _>(|conn| {
                Box::pin(async move {
                    let recipient_exists = dsl::select(dsl::exists(users.find(to_user_id)))
                        .get_result::<bool>(conn)
                        .await?;

                    if !recipient_exists {
                        return Err(PartnerError::UserNotFound);
                    }

                    let either_has_partner = dsl::select(dsl::exists(
                        partnership_members.filter(
                            partnership_member_fields::user_id.eq_any([from_user_id, to_user_id]),
                        ),
                    ))
                    .get_result::<bool>(conn)
                    .await?;

                    // Stale invitations between the pair must not block a new one
                    dsl::update(
                        partner_invitations
                            .filter(between_pair(from_user_id, to_user_id))
                            .filter(invitation_fields::status.eq(InvitationStatus::Pending))
                            .filter(invitation_fields::expires_at.le(now)),
                    )
                    .set(invitation_fields::status.eq(InvitationStatus::Expired))
                    .execute(conn)
                    .await?;

                    let pending_between_pair = dsl::select(dsl::exists(
                        partner_invitations
                            .filter(between_pair(from_user_id, to_user_id))
                            .filter(invitation_fields::status.eq(InvitationStatus::Pending)),
                    ))
                    .get_result::<bool>(conn)
                    .await?;

                    check_invite(
                        from_user_id,
                        to_user_id,
                        either_has_partner,
                        pending_between_pair,
                    )?;

                    Ok(dsl::insert_into(partner_invitations)
                        .values(&new_invitation)
                        .get_result::<PartnerInvitation>(conn)
                        .await?)
                })
            })
            .await
    }

    /// Accepts an invitation addressed to `user_id`, pairing the two users. Returns the new
    /// partner's id.
    pub async fn accept(
        &self,
        user_id: Uuid,
        token: &str,
        now: SystemTime,
    ) -> Result<Uuid, PartnerError> {
        let invitation = self.get_invitation_by_token(token).await?;

        if check_transition(&invitation, user_id, Party::Recipient, now)?
            == TransitionCheck::ExpireNow
        {
            self.expire(invitation.id).await?;
            return Err(PartnerError::InvitationExpired);
        }

        let invitation_id = invitation.id;
        let sender_id = invitation.from_user_id;
        let recipient_id = invitation.to_user_id;

        let partnership = NewPartnership::for_pair(sender_id, recipient_id, now);
        let members = [
            NewPartnershipMember {
                user_id: sender_id,
                partnership_id: partnership.id,
                partner_id: recipient_id,
            },
            NewPartnershipMember {
                user_id: recipient_id,
                partnership_id: partnership.id,
                partner_id: sender_id,
            },
        ];

        let mut db_connection = self.db_async_pool.get().await?;

        db_connection
            .build_transaction()
            .run::<_, PartnerError, _>(|conn| {
                Box::pin(async move {
                    let status = partner_invitations
                        .select(invitation_fields::status)
                        .find(invitation_id)
                        .for_update()
                        .first::<InvitationStatus>(conn)
                        .await?;

                    if status != InvitationStatus::Pending {
                        return Err(PartnerError::InvitationNotFound);
                    }

                    let either_has_partner = dsl::select(dsl::exists(
                        partnership_members.filter(
                            partnership_member_fields::user_id.eq_any([sender_id, recipient_id]),
                        ),
                    ))
                    .get_result::<bool>(conn)
                    .await?;

                    if either_has_partner {
                        return Err(PartnerError::AlreadyPartnered);
                    }

                    // The primary key on partnership_members catches a concurrent pairing
                    let map_pairing_error = |e: diesel::result::Error| {
                        if is_unique_violation(&e) {
                            PartnerError::AlreadyPartnered
                        } else {
                            PartnerError::from(e)
                        }
                    };

                    dsl::insert_into(partnerships)
                        .values(&partnership)
                        .execute(conn)
                        .await
                        .map_err(map_pairing_error)?;

                    dsl::insert_into(partnership_members)
                        .values(&members[..])
                        .execute(conn)
                        .await
                        .map_err(map_pairing_error)?;

                    dsl::update(partner_invitations.find(invitation_id))
                        .set(invitation_fields::status.eq(InvitationStatus::Accepted))
                        .execute(conn)
                        .await?;

                    diesel::delete(
                        partner_invitations
                            .filter(between_pair(sender_id, recipient_id))
                            .filter(invitation_fields::status.eq(InvitationStatus::Accepted))
                            .filter(invitation_fields::id.ne(invitation_id)),
                    )
                    .execute(conn)
                    .await?;

                    let pair = [sender_id, recipient_id];
                    dsl::update(
                        partner_invitations
                            .filter(invitation_fields::status.eq(InvitationStatus::Pending))
                            .filter(invitation_fields::id.ne(invitation_id))
                            .filter(
                                invitation_fields::from_user_id
                                    .eq_any(pair)
                                    .or(invitation_fields::to_user_id.eq_any(pair)),
                            ),
                    )
                    .set(invitation_fields::status.eq(InvitationStatus::Expired))
                    .execute(conn)
                    .await?;

                    Ok(())
                })
            })
            .await?;

        Ok(sender_id)
    }

    pub async fn decline(
        &self,
        user_id: Uuid,
        token: &str,
        now: SystemTime,
    ) -> Result<(), PartnerError> {
        let invitation = self.get_invitation_by_token(token).await?;
        self.close(&invitation, user_id, Party::Recipient, now)
            .await
    }

    pub async fn cancel(
        &self,
        user_id: Uuid,
        invitation_id: Uuid,
        now: SystemTime,
    ) -> Result<(), PartnerError> {
        let mut conn = self.db_async_pool.get().await?;
        let invitation = partner_invitations
            .find(invitation_id)
            .first::<PartnerInvitation>(&mut conn)
            .await
            .optional()?
            .ok_or(PartnerError::InvitationNotFound)?;

        drop(conn);

        self.close(&invitation, user_id, Party::Sender, now).await
    }

    /// Dissolves the user's partnership. Data either partner created stays where it is.
    pub async fn remove_partnership(&self, user_id: Uuid) -> Result<Uuid, PartnerError> {
        let mut db_connection = self.db_async_pool.get().await?;

        db_connection
            .build_transaction()
            .run::<_, PartnerError, _>(|conn| {
                Box::pin(async move {
                    let (partnership_id, partner_id) = partnership_members
                        .select((
                            partnership_member_fields::partnership_id,
                            partnership_member_fields::partner_id,
                        ))
                        .filter(partnership_member_fields::user_id.eq(user_id))
                        .for_update()
                        .first::<(Uuid, Uuid)>(conn)
                        .await
                        .optional()?
                        .ok_or(PartnerError::NoPartner)?;

                    diesel::delete(
                        partnership_members
                            .filter(partnership_member_fields::partnership_id.eq(partnership_id)),
                    )
                    .execute(conn)
                    .await?;

                    diesel::delete(partnerships.find(partnership_id))
                        .execute(conn)
                        .await?;

                    diesel::delete(
                        partner_invitations
                            .filter(between_pair(user_id, partner_id))
                            .filter(invitation_fields::status.eq(InvitationStatus::Accepted)),
                    )
                    .execute(conn)
                    .await?;

                    Ok(partner_id)
                })
            })
            .await
    }

    /// Pending invitations addressed to the user. Invitations that have outlived their lifetime
    /// are marked expired on the way.
    pub async fn get_received_invitations(
        &self,
        user_id: Uuid,
        now: SystemTime,
    ) -> Result<Vec<InvitationWithUser>, DaoError> {
        let mut conn = self.db_async_pool.get().await?;

        expire_stale_invitations(&mut conn, user_id, now).await?;

        let rows = partner_invitations
            .inner_join(users.on(user_fields::id.eq(invitation_fields::from_user_id)))
            .select((
                invitation_fields::all_columns,
                (
                    user_fields::id,
                    user_fields::name,
                    user_fields::email,
                    user_fields::currency,
                ),
            ))
            .filter(invitation_fields::to_user_id.eq(user_id))
            .filter(invitation_fields::status.eq(InvitationStatus::Pending))
            .order(invitation_fields::created_timestamp.desc())
            .load::<(PartnerInvitation, UserSummary)>(&mut conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(invitation, other_user)| InvitationWithUser {
                invitation,
                other_user,
            })
            .collect())
    }

    pub async fn get_sent_invitations(
        &self,
        user_id: Uuid,
        now: SystemTime,
    ) -> Result<Vec<InvitationWithUser>, DaoError> {
        let mut conn = self.db_async_pool.get().await?;

        expire_stale_invitations(&mut conn, user_id, now).await?;

        let rows = partner_invitations
            .inner_join(users.on(user_fields::id.eq(invitation_fields::to_user_id)))
            .select((
                invitation_fields::all_columns,
                (
                    user_fields::id,
                    user_fields::name,
                    user_fields::email,
                    user_fields::currency,
                ),
            ))
            .filter(invitation_fields::from_user_id.eq(user_id))
            .filter(invitation_fields::status.eq(InvitationStatus::Pending))
            .order(invitation_fields::created_timestamp.desc())
            .load::<(PartnerInvitation, UserSummary)>(&mut conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(invitation, other_user)| InvitationWithUser {
                invitation,
                other_user,
            })
            .collect())
    }

    async fn get_invitation_by_token(&self, token: &str) -> Result<PartnerInvitation, PartnerError> {
        let mut conn = self.db_async_pool.get().await?;
        partner_invitations
            .filter(invitation_fields::token.eq(token))
            .first::<PartnerInvitation>(&mut conn)
            .await
            .optional()?
            .ok_or(PartnerError::InvitationNotFound)
    }

    async fn expire(&self, invitation_id: Uuid) -> Result<(), DaoError> {
        let mut conn = self.db_async_pool.get().await?;
        dsl::update(
            partner_invitations
                .find(invitation_id)
                .filter(invitation_fields::status.eq(InvitationStatus::Pending)),
        )
        .set(invitation_fields::status.eq(InvitationStatus::Expired))
        .execute(&mut conn)
        .await?;

        Ok(())
    }

    async fn close(
        &self,
        invitation: &PartnerInvitation,
        user_id: Uuid,
        party: Party,
        now: SystemTime,
    ) -> Result<(), PartnerError> {
        if check_transition(invitation, user_id, party, now)? == TransitionCheck::ExpireNow {
            self.expire(invitation.id).await?;
            return Err(PartnerError::InvitationExpired);
        }

        let mut conn = self.db_async_pool.get().await?;
        let updated_row_count = dsl::update(
            partner_invitations
                .find(invitation.id)
                .filter(invitation_fields::status.eq(InvitationStatus::Pending)),
        )
        .set(invitation_fields::status.eq(InvitationStatus::Declined))
        .execute(&mut conn)
        .await?;

        if updated_row_count == 0 {
            return Err(PartnerError::InvitationNotFound);
        }

        Ok(())
    }
}

type InvitationDirection = dsl::And<
    dsl::Eq<invitation_fields::from_user_id, Uuid>,
    dsl::Eq<invitation_fields::to_user_id, Uuid>,
>;

/// Matches invitations between `a` and `b` in either direction.
fn between_pair(a: Uuid, b: Uuid) -> dsl::Or<InvitationDirection, InvitationDirection> {
    invitation_fields::from_user_id
        .eq(a)
        .and(invitation_fields::to_user_id.eq(b))
        .or(invitation_fields::from_user_id
            .eq(b)
            .and(invitation_fields::to_user_id.eq(a)))
}

async fn expire_stale_invitations(
    conn: &mut diesel_async::AsyncPgConnection,
    user_id: Uuid,
    now: SystemTime,
) -> Result<usize, diesel::result::Error> {
    dsl::update(
        partner_invitations
            .filter(
                invitation_fields::from_user_id
                    .eq(user_id)
                    .or(invitation_fields::to_user_id.eq(user_id)),
            )
            .filter(invitation_fields::status.eq(InvitationStatus::Pending))
            .filter(invitation_fields::expires_at.le(now)),
    )
    .set(invitation_fields::status.eq(InvitationStatus::Expired))
    .execute(conn)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories::OTHER_EXPENSE_CATEGORY_ID;
    use crate::db::list::ListItemFields;
    use crate::db::transaction::TransactionFields;
    use crate::db::{category, list, test_utils, transaction};
    use crate::models::category::CategoryType;
    use crate::models::transaction::RepeatType;
    use crate::partner::INVITATION_LIFETIME;
    use chrono::NaiveDate;
    use std::time::Duration;

    fn dao() -> Dao {
        Dao::new(test_utils::db_async_pool())
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ignore]
    async fn test_invite_accept_remove() {
        let dao = dao();
        let a = test_utils::insert_user().await;
        let b = test_utils::insert_user().await;
        let c = test_utils::insert_user().await;
        let now = SystemTime::now();

        let invitation = dao.invite(a, b, now).await.unwrap();
        assert_eq!(invitation.status, InvitationStatus::Pending);
        assert_eq!(
            invitation
                .expires_at
                .duration_since(invitation.created_timestamp)
                .unwrap(),
            INVITATION_LIFETIME
        );
        assert_eq!(INVITATION_LIFETIME, Duration::from_secs(7 * 24 * 60 * 60));

        assert!(matches!(
            dao.invite(a, b, now).await,
            Err(PartnerError::DuplicateInvitation)
        ));
        assert!(matches!(
            dao.invite(b, a, now).await,
            Err(PartnerError::DuplicateInvitation)
        ));

        let competing = dao.invite(c, b, now).await.unwrap();

        assert_eq!(dao.accept(b, &invitation.token, now).await.unwrap(), a);
        assert_eq!(dao.get_partner_id(a).await.unwrap(), Some(b));
        assert_eq!(dao.get_partner_id(b).await.unwrap(), Some(a));

        // The competing invitation was invalidated by the pairing
        assert!(matches!(
            dao.accept(b, &competing.token, now).await,
            Err(PartnerError::InvitationExpired)
        ));
        assert!(matches!(
            dao.invite(c, a, now).await,
            Err(PartnerError::AlreadyPartnered)
        ));

        assert_eq!(dao.remove_partnership(a).await.unwrap(), b);
        assert_eq!(dao.get_partner_id(b).await.unwrap(), None);
        assert!(matches!(
            dao.remove_partnership(a).await,
            Err(PartnerError::NoPartner)
        ));

        test_utils::delete_user(a).await;
        test_utils::delete_user(b).await;
        test_utils::delete_user(c).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ignore]
    async fn test_expired_accept_transitions_once() {
        let dao = dao();
        let a = test_utils::insert_user().await;
        let b = test_utils::insert_user().await;
        let long_ago = SystemTime::now() - Duration::from_secs(8 * 24 * 60 * 60);

        let invitation = dao.invite(a, b, long_ago).await.unwrap();
        let now = SystemTime::now();

        assert!(matches!(
            dao.accept(b, &invitation.token, now).await,
            Err(PartnerError::InvitationExpired)
        ));
        assert!(matches!(
            dao.accept(b, &invitation.token, now).await,
            Err(PartnerError::InvitationExpired)
        ));
        assert!(dao.get_received_invitations(b, now).await.unwrap().is_empty());

        test_utils::delete_user(a).await;
        test_utils::delete_user(b).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ignore]
    async fn test_decline_and_cancel() {
        let dao = dao();
        let a = test_utils::insert_user().await;
        let b = test_utils::insert_user().await;
        let now = SystemTime::now();

        let invitation = dao.invite(a, b, now).await.unwrap();
        assert!(matches!(
            dao.decline(a, &invitation.token, now).await,
            Err(PartnerError::NotPermitted)
        ));
        dao.decline(b, &invitation.token, now).await.unwrap();
        assert!(matches!(
            dao.accept(b, &invitation.token, now).await,
            Err(PartnerError::InvitationNotFound)
        ));

        let invitation = dao.invite(a, b, now).await.unwrap();
        assert_eq!(dao.get_sent_invitations(a, now).await.unwrap().len(), 1);
        dao.cancel(a, invitation.id, now).await.unwrap();
        assert!(dao.get_sent_invitations(a, now).await.unwrap().is_empty());

        test_utils::delete_user(a).await;
        test_utils::delete_user(b).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ignore]
    async fn test_remove_partnership_keeps_data() {
        let dao = dao();
        let pool = test_utils::db_async_pool();
        let transaction_dao = transaction::Dao::new(pool);
        let category_dao = category::Dao::new(pool);
        let list_dao = list::Dao::new(pool);

        let a = test_utils::insert_user().await;
        let b = test_utils::insert_user().await;
        let now = SystemTime::now();

        let invitation = dao.invite(a, b, now).await.unwrap();
        dao.accept(b, &invitation.token, now).await.unwrap();

        let pets = category_dao
            .create_category(a, "Pets", CategoryType::Expense, "#aa5500")
            .await
            .unwrap();

        let fields = |description, category_id| TransactionFields {
            category_id,
            description,
            amount_cents: 3_000,
            date: NaiveDate::from_ymd_opt(2025, 6, 12).unwrap(),
            is_fixed: false,
            repeat_type: Some(RepeatType::Once),
            end_date: None,
            is_private: false,
        };

        let a_own = transaction_dao
            .create_transaction(a, a, &fields("Vet", pets.id))
            .await
            .unwrap();
        let b_own = transaction_dao
            .create_transaction(b, b, &fields("Lunch", OTHER_EXPENSE_CATEGORY_ID))
            .await
            .unwrap();
        let a_for_b = transaction_dao
            .create_transaction(b, a, &fields("Cinema", OTHER_EXPENSE_CATEGORY_ID))
            .await
            .unwrap();

        let groceries = list_dao
            .create_list(a, "Groceries", "#00aa55", true)
            .await
            .unwrap();
        let milk = list_dao
            .add_item(
                groceries.id,
                b,
                &ListItemFields {
                    name: "Milk",
                    estimated_price_cents: Some(150),
                    actual_price_cents: None,
                    category_id: OTHER_EXPENSE_CATEGORY_ID,
                },
            )
            .await
            .unwrap();

        assert!(list_dao
            .get_visible_list(b, groceries.id)
            .await
            .unwrap()
            .is_some());

        assert_eq!(dao.remove_partnership(b).await.unwrap(), a);

        for (owner, created) in [(a, &a_own), (b, &b_own), (b, &a_for_b)] {
            let stored = transaction_dao
                .get_visible_transaction(owner, created.id)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(&stored, created);
        }
        assert!(transaction_dao
            .get_visible_transaction(a, b_own.id)
            .await
            .unwrap()
            .is_none());

        let stored_pets = category_dao
            .get_visible_custom_category(a, pets.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored_pets.user_id, a);
        assert_eq!(stored_pets.name, "Pets");
        assert_eq!(stored_pets.category_type, CategoryType::Expense);
        assert_eq!(stored_pets.color, "#aa5500");
        assert!(category_dao
            .get_visible_custom_category(b, pets.id)
            .await
            .unwrap()
            .is_none());

        let (stored_list, items) = list_dao
            .get_visible_list(a, groceries.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored_list.user_id, a);
        assert_eq!(stored_list.title, "Groceries");
        assert!(stored_list.is_shared);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, milk.id);
        assert_eq!(items[0].created_by, b);
        assert!(list_dao
            .get_visible_list(b, groceries.id)
            .await
            .unwrap()
            .is_none());

        test_utils::delete_user(a).await;
        test_utils::delete_user(b).await;
    }
}
