use diesel::{dsl, BoolExpressionMethods, ExpressionMethods, NullableExpressionMethods, QueryDsl};
use diesel::{JoinOnDsl, PgTextExpressionMethods};
use diesel_async::RunQueryDsl;
use std::time::SystemTime;
use uuid::Uuid;

use crate::db::{is_unique_violation, DaoError, DbAsyncPool};
use crate::models::user::{NewUser, User};

use crate::schema::partnership_members as partnership_member_fields;
use crate::schema::partnership_members::dsl::partnership_members;
use crate::schema::users as user_fields;
use crate::schema::users::dsl::users;

pub const MAX_SEARCH_RESULTS: i64 = 10;

#[derive(Clone, Debug)]
pub struct UserSearchResult {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub has_partner: bool,
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

    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        currency: &str,
        password_hash: &str,
    ) -> Result<Uuid, DaoError> {
        let user_id = Uuid::now_v7();
        let email_lowercase = email.to_lowercase();

        let new_user = NewUser {
            id: user_id,
            name,
            email: &email_lowercase,
            currency,
            password_hash,
            created_timestamp: SystemTime::now(),
        };

        let mut conn = self.db_async_pool.get().await?;
        let result = dsl::insert_into(users)
            .values(&new_user)
            .execute(&mut conn)
            .await;

        match result {
            Ok(_) => Ok(user_id),
            Err(e) if is_unique_violation(&e) => {
                Err(DaoError::CannotRunQuery("Email address is already in use"))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_user_by_id(&self, user_id: Uuid) -> Result<User, DaoError> {
        let mut conn = self.db_async_pool.get().await?;
        Ok(users.find(user_id).first::<User>(&mut conn).await?)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<User, DaoError> {
        let mut conn = self.db_async_pool.get().await?;
        Ok(users
            .filter(user_fields::email.eq(email.to_lowercase()))
            .first::<User>(&mut conn)
            .await?)
    }

    pub async fn update_user(
        &self,
        user_id: Uuid,
        name: &str,
        currency: &str,
    ) -> Result<(), DaoError> {
        let mut conn = self.db_async_pool.get().await?;
        let affected_row_count = dsl::update(users.find(user_id))
            .set((
                user_fields::name.eq(name),
                user_fields::currency.eq(currency),
            ))
            .execute(&mut conn)
            .await?;

        if affected_row_count == 0 {
            return Err(DaoError::QueryFailure(diesel::result::Error::NotFound));
        }

        Ok(())
    }

    /// Case-insensitive substring search over names and emails, excluding the searching user.
    pub async fn search_users(
        &self,
        query: &str,
        searching_user_id: Uuid,
    ) -> Result<Vec<UserSearchResult>, DaoError> {
        let pattern = format!("%{}%", escape_like_pattern(query));

        let mut conn = self.db_async_pool.get().await?;
        let rows = users
            .left_join(
                partnership_members.on(partnership_member_fields::user_id.eq(user_fields::id)),
            )
            .select((
                user_fields::id,
                user_fields::name,
                user_fields::email,
                partnership_member_fields::partner_id.nullable(),
            ))
            .filter(user_fields::id.ne(searching_user_id))
            .filter(
                user_fields::name
                    .ilike(&pattern)
                    .or(user_fields::email.ilike(&pattern)),
            )
            .order(user_fields::name.asc())
            .limit(MAX_SEARCH_RESULTS)
            .load::<(Uuid, String, String, Option<Uuid>)>(&mut conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, email, partner_id)| UserSearchResult {
                id,
                name,
                email,
                has_partner: partner_id.is_some(),
            })
            .collect())
    }
}

fn escape_like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());

    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }

        escaped.push(c);
    }

    escaped
}
