use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl};
use diesel_async::pooled_connection::bb8::Pool as AsyncPool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use crate::schema::partnership_members as partnership_member_fields;
use crate::schema::partnership_members::dsl::partnership_members;

pub mod category;
pub mod job_registry;
pub mod list;
pub mod partner;
pub mod recurring;
pub mod transaction;
pub mod user;

pub type DbAsyncPool = AsyncPool<AsyncPgConnection>;
pub type DbAsyncConnection =
    bb8::PooledConnection<'static, AsyncDieselConnectionManager<AsyncPgConnection>>;

pub async fn create_db_async_pool(
    database_uri: &str,
    max_db_connections: u32,
    idle_timeout: Duration,
) -> DbAsyncPool {
    let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_uri);
    AsyncPool::builder()
        .max_size(max_db_connections)
        .idle_timeout(Some(idle_timeout))
        .build(config)
        .await
        .expect("Failed to create async DB pool")
}

#[derive(Debug)]
pub enum DaoError {
    DbAsyncPoolFailure(String),
    QueryFailure(diesel::result::Error),
    CannotRunQuery(&'static str),
    WontRunQuery, // This error indicates that the DAO refuses to run a query
}

impl DaoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DaoError::QueryFailure(DieselError::NotFound))
    }
}

impl std::error::Error for DaoError {}

impl fmt::Display for DaoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaoError::DbAsyncPoolFailure(e) => {
                write!(f, "DaoError: Failed to obtain async DB connection: {e}")
            }
            DaoError::QueryFailure(e) => {
                write!(f, "DaoError: Query failed: {e}")
            }
            DaoError::CannotRunQuery(msg) => {
                write!(f, "DaoError: Cannot run query: {msg}")
            }
            DaoError::WontRunQuery => {
                write!(f, "DaoError: DAO will not run query")
            }
        }
    }
}

impl<E: std::error::Error + Send + Sync + 'static> From<bb8::RunError<E>> for DaoError {
    fn from(error: bb8::RunError<E>) -> Self {
        DaoError::DbAsyncPoolFailure(error.to_string())
    }
}

impl From<diesel::result::Error> for DaoError {
    fn from(error: diesel::result::Error) -> Self {
        DaoError::QueryFailure(error)
    }
}

pub(crate) fn is_unique_violation(error: &DieselError) -> bool {
    matches!(
        error,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
    )
}

/// Looks up the current partner of a user. Every DAO that widens its scope to a user's partner
/// goes through this so the scope is read on the same connection as the rest of the query.
pub(crate) async fn find_partner_id(
    conn: &mut AsyncPgConnection,
    user_id: Uuid,
) -> Result<Option<Uuid>, DieselError> {
    partnership_members
        .select(partnership_member_fields::partner_id)
        .filter(partnership_member_fields::user_id.eq(user_id))
        .first::<Uuid>(conn)
        .await
        .optional()
}

/// The user plus their partner, if they have one.
pub(crate) async fn visibility_scope(
    conn: &mut AsyncPgConnection,
    user_id: Uuid,
) -> Result<Vec<Uuid>, DieselError> {
    let mut scope = vec![user_id];

    if let Some(partner_id) = find_partner_id(conn, user_id).await? {
        scope.push(partner_id);
    }

    Ok(scope)
}
