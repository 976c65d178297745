//! `PostgreSQL` user queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use storerate_core::query::UserField;
use storerate_core::{Email, ListQuery, Page, Pagination, Role, UserId};

use super::{
    PgRepository, RepositoryError, UserRepository, conflict, count, parse_stored_email,
    push_filters, push_order_and_page, user_column,
};
use crate::models::{NewUser, User, UserChanges};

const USER_COLUMNS: &str = "id, name, email, address, role, created_at, updated_at";

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` user queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    name: String,
    email: String,
    address: String,
    role: Role,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId::new(row.id),
            email: parse_stored_email(&row.email)?,
            name: row.name,
            address: row.address,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

#[async_trait]
impl UserRepository for PgRepository {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn find_password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        let hash = sqlx::query_scalar::<_, String>("SELECT password_hash FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(hash)
    }

    async fn list_users(
        &self,
        query: &ListQuery<UserField>,
    ) -> Result<Page<User>, RepositoryError> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        push_filters(&mut count_qb, &query.filters, user_column);
        let total: i64 = count_qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        push_filters(&mut qb, &query.filters, user_column);
        push_order_and_page(&mut qb, query, user_column, UserField::is_free_text, "id");
        let rows: Vec<UserRow> = qb.build_query_as::<UserRow>().fetch_all(&self.pool).await?;

        Ok(Page {
            items: rows
                .into_iter()
                .map(TryInto::try_into)
                .collect::<Result<_, _>>()?,
            pagination: Pagination::new(count(total), query.page),
        })
    }

    async fn recent_users(&self, limit: u32) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC LIMIT $1"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn count_users(&self) -> Result<u64, RepositoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count(total))
    }

    async fn count_users_by_role(&self) -> Result<Vec<(Role, u64)>, RepositoryError> {
        let rows = sqlx::query_as::<_, (Role, i64)>(
            "SELECT role, COUNT(*) FROM users GROUP BY role ORDER BY role",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(role, n)| (role, count(n))).collect())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            INSERT INTO users (name, email, password_hash, address, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(user.name.as_str())
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(user.address.as_str())
        .bind(user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, conflict::USER_EMAIL_EXISTS))?;

        row.try_into()
    }

    async fn update_user(
        &self,
        id: UserId,
        changes: UserChanges,
    ) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Lock the user so no store can be assigned to them while the role
        // check below is in flight.
        let current: Role = sqlx::query_scalar("SELECT role FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        if current == Role::Owner && changes.role != Role::Owner {
            let owns_stores: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM stores WHERE owner_id = $1)")
                    .bind(id)
                    .fetch_one(&mut *tx)
                    .await?;
            if owns_stores {
                return Err(RepositoryError::Conflict(
                    conflict::OWNER_ROLE_LOCKED.to_owned(),
                ));
            }
        }

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            UPDATE users
            SET name = $1, email = $2, address = $3, role = $4, updated_at = NOW()
            WHERE id = $5
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(changes.name.as_str())
        .bind(changes.email.as_str())
        .bind(changes.address.as_str())
        .bind(changes.role)
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, conflict::USER_EMAIL_TAKEN))?;

        tx.commit().await?;
        row.try_into()
    }

    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(password_hash)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match RepositoryError::from_write(e, conflict::OWNER_DELETE_LOCKED) {
                // stores.owner_id is ON DELETE RESTRICT
                RepositoryError::InvalidReference(_) => {
                    RepositoryError::Conflict(conflict::OWNER_DELETE_LOCKED.to_owned())
                }
                other => other,
            })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
