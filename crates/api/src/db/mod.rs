//! Persistence for StoreRate.
//!
//! # Tables
//!
//! - `users` - Accounts of every role, keyed by unique email
//! - `stores` - Stores, each owned by one OWNER user (`ON DELETE RESTRICT`)
//! - `ratings` - One row per (user, store), cascading with both parents
//!
//! # Adapters
//!
//! Services only ever see `Arc<dyn Repository>`. Two adapters implement it:
//!
//! - [`PgRepository`] - `PostgreSQL` via sqlx (production)
//! - [`MemoryRepository`] - in-process tables behind one async mutex (tests, demos)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p storerate-cli -- migrate
//! ```

pub mod memory;
pub mod ratings;
pub mod stores;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use thiserror::Error;

use storerate_core::query::{Filter, Matcher, StoreField, UserField};
use storerate_core::{
    Email, ListQuery, Page, PageRequest, RatingId, RatingValue, Role, StoreId, UserId,
};

use crate::models::{
    NewStore, NewUser, Rating, RatingSample, RatingView, SampleScope, Store, StoreChanges, User,
    UserChanges,
};

pub use memory::MemoryRepository;

/// Embedded schema migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Client-facing conflict messages produced by repository writes.
pub mod conflict {
    pub const USER_EMAIL_EXISTS: &str = "User with this email already exists";
    pub const USER_EMAIL_TAKEN: &str = "Email is already taken by another user";
    pub const STORE_EMAIL_EXISTS: &str = "Store with this email already exists";
    pub const INVALID_OWNER: &str = "Invalid owner ID or user is not a store owner";
    pub const OWNER_ROLE_LOCKED: &str =
        "Cannot change the role of a user who still owns stores. Reassign or delete the stores first.";
    pub const OWNER_DELETE_LOCKED: &str =
        "Cannot delete a user who still owns stores. Reassign or delete the stores first.";
}

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A referenced row is missing or of the wrong kind.
    #[error("invalid reference: {0}")]
    InvalidReference(String),
}

impl RepositoryError {
    /// Classify a failed write: unique violations become [`Self::Conflict`]
    /// carrying `conflict`, foreign key violations [`Self::InvalidReference`].
    fn from_write(err: sqlx::Error, conflict: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return Self::Conflict(conflict.to_owned());
            }
            if db_err.is_foreign_key_violation() {
                return Self::InvalidReference(
                    db_err.constraint().unwrap_or("foreign key").to_owned(),
                );
            }
        }
        Self::Database(err)
    }
}

// =============================================================================
// Repository seam
// =============================================================================

/// User persistence.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// The stored password hash of a user.
    async fn find_password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError>;

    async fn list_users(&self, query: &ListQuery<UserField>)
    -> Result<Page<User>, RepositoryError>;

    /// Newest users first.
    async fn recent_users(&self, limit: u32) -> Result<Vec<User>, RepositoryError>;

    async fn count_users(&self) -> Result<u64, RepositoryError>;

    /// User count per role. Roles without users may be absent.
    async fn count_users_by_role(&self) -> Result<Vec<(Role, u64)>, RepositoryError>;

    /// # Errors
    ///
    /// `Conflict` when the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError>;

    /// Replace a user's profile fields.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id. `Conflict` when the email belongs to
    /// another user, or when an OWNER who still owns stores would lose the
    /// OWNER role.
    async fn update_user(&self, id: UserId, changes: UserChanges)
    -> Result<User, RepositoryError>;

    async fn update_password(&self, id: UserId, password_hash: &str)
    -> Result<(), RepositoryError>;

    /// Delete a user and, by cascade, their ratings.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `Conflict` while the user owns stores.
    async fn delete_user(&self, id: UserId) -> Result<(), RepositoryError>;
}

/// Store persistence. Every returned [`Store`] carries its owner.
#[async_trait]
pub trait StoreRepository: Send + Sync {
    async fn find_store(&self, id: StoreId) -> Result<Option<Store>, RepositoryError>;

    async fn list_stores(
        &self,
        query: &ListQuery<StoreField>,
    ) -> Result<Page<Store>, RepositoryError>;

    /// Newest stores first.
    async fn recent_stores(&self, limit: u32) -> Result<Vec<Store>, RepositoryError>;

    async fn stores_by_owner(&self, owner_id: UserId) -> Result<Vec<Store>, RepositoryError>;

    async fn stores_by_ids(&self, ids: &[StoreId]) -> Result<Vec<Store>, RepositoryError>;

    async fn count_stores(&self) -> Result<u64, RepositoryError>;

    /// # Errors
    ///
    /// `Conflict` when the email is taken, `InvalidReference` when the owner
    /// is missing or not an OWNER.
    async fn create_store(&self, store: NewStore) -> Result<Store, RepositoryError>;

    /// # Errors
    ///
    /// As [`Self::create_store`], plus `NotFound` for an unknown id.
    async fn update_store(
        &self,
        id: StoreId,
        changes: StoreChanges,
    ) -> Result<Store, RepositoryError>;

    async fn delete_store(&self, id: StoreId) -> Result<(), RepositoryError>;
}

/// Rating persistence.
#[async_trait]
pub trait RatingRepository: Send + Sync {
    /// Insert the rating of `user_id` for `store_id`, or overwrite its value
    /// when one exists. Atomic: concurrent calls for the same pair leave one
    /// row. Returns the row and whether it already existed.
    ///
    /// # Errors
    ///
    /// `InvalidReference` when the store or user does not exist.
    async fn upsert_rating(
        &self,
        user_id: UserId,
        store_id: StoreId,
        value: RatingValue,
    ) -> Result<(Rating, bool), RepositoryError>;

    async fn find_rating(&self, id: RatingId) -> Result<Option<Rating>, RepositoryError>;

    async fn delete_rating(&self, id: RatingId) -> Result<(), RepositoryError>;

    /// Every rating written by `user_id`, newest first.
    async fn ratings_by_user(&self, user_id: UserId) -> Result<Vec<RatingView>, RepositoryError>;

    /// One page of a store's ratings, newest first, optionally restricted to
    /// a single author.
    async fn ratings_for_store(
        &self,
        store_id: StoreId,
        author: Option<UserId>,
        page: PageRequest,
    ) -> Result<Page<RatingView>, RepositoryError>;

    /// Newest ratings across all stores.
    async fn recent_ratings(&self, limit: u32) -> Result<Vec<RatingView>, RepositoryError>;

    async fn count_ratings(&self) -> Result<u64, RepositoryError>;

    async fn rating_samples(
        &self,
        scope: &SampleScope,
    ) -> Result<Vec<RatingSample>, RepositoryError>;
}

/// Everything the services need from storage.
#[async_trait]
pub trait Repository: UserRepository + StoreRepository + RatingRepository {
    /// Check that storage is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

// =============================================================================
// PostgreSQL adapter
// =============================================================================

/// `PostgreSQL` implementation of [`Repository`].
#[derive(Debug, Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

// =============================================================================
// SQL helpers
// =============================================================================

const fn user_column(field: UserField) -> &'static str {
    match field {
        UserField::Name => "name",
        UserField::Email => "email",
        UserField::Address => "address",
        UserField::Role => "role",
        UserField::CreatedAt => "created_at",
    }
}

const fn store_column(field: StoreField) -> &'static str {
    match field {
        StoreField::Name => "s.name",
        StoreField::Email => "s.email",
        StoreField::Address => "s.address",
        StoreField::CreatedAt => "s.created_at",
    }
}

/// Escape `LIKE` wildcards so user input only ever matches literally.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Append `WHERE` clauses for `filters`.
fn push_filters<F: Copy>(
    qb: &mut QueryBuilder<'_, Postgres>,
    filters: &[Filter<F>],
    column: fn(F) -> &'static str,
) {
    for (i, filter) in filters.iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        qb.push(column(filter.field));
        match &filter.matcher {
            Matcher::Contains(needle) => {
                qb.push(" ILIKE ")
                    .push_bind(format!("%{}%", escape_like(needle)))
                    .push(" ESCAPE '\\'");
            }
            Matcher::Exact(value) => {
                qb.push("::text = ").push_bind(value.clone());
            }
        }
    }
}

/// Append `ORDER BY`, `LIMIT` and `OFFSET` for a listing.
///
/// Free-text columns order case-insensitively with a byte-order tiebreak,
/// matching `storerate_core::query::compare_text`.
fn push_order_and_page<F: Copy>(
    qb: &mut QueryBuilder<'_, Postgres>,
    query: &ListQuery<F>,
    column: fn(F) -> &'static str,
    free_text: fn(F) -> bool,
    key: &str,
) {
    let col = column(query.sort_by);
    let dir = query.sort_order.as_sql();
    if free_text(query.sort_by) {
        qb.push(format_args!(
            " ORDER BY LOWER({col}) {dir}, {col} COLLATE \"C\" {dir}, {key} ASC"
        ));
    } else {
        qb.push(format_args!(" ORDER BY {col} {dir}, {key} ASC"));
    }
    qb.push(" LIMIT ")
        .push_bind(i64::from(query.page.limit()))
        .push(" OFFSET ")
        .push_bind(i64::try_from(query.page.offset()).unwrap_or(i64::MAX));
}

/// Convert a `COUNT(*)` result.
fn count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

fn parse_stored_email(raw: &str) -> Result<Email, RepositoryError> {
    Email::parse(raw)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid email in database: {e}")))
}

#[cfg(test)]
mod tests {
    use storerate_core::SortOrder;

    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_filters_render_placeholders() {
        let query = ListQuery::<UserField>::default()
            .filter(UserField::Name, Matcher::Contains("ann".to_owned()))
            .filter(UserField::Role, Matcher::Exact("OWNER".to_owned()));
        let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM users");
        push_filters(&mut qb, &query.filters, user_column);
        push_order_and_page(&mut qb, &query, user_column, UserField::is_free_text, "id");
        assert_eq!(
            qb.sql(),
            "SELECT id FROM users WHERE name ILIKE $1 ESCAPE '\\' AND role::text = $2 \
             ORDER BY LOWER(name) ASC, name COLLATE \"C\" ASC, id ASC LIMIT $3 OFFSET $4"
        );
    }

    #[test]
    fn test_non_text_sort_is_plain() {
        let query = ListQuery::<UserField>::default().sort(UserField::Role, SortOrder::Desc);
        let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM users");
        push_order_and_page(&mut qb, &query, user_column, UserField::is_free_text, "id");
        assert_eq!(
            qb.sql(),
            "SELECT id FROM users ORDER BY role DESC, id ASC LIMIT $1 OFFSET $2"
        );
    }
}
