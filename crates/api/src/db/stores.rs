//! `PostgreSQL` store queries.
//!
//! Stores are always read joined with their owner so callers never need a
//! second round-trip for the owner's name and email.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Postgres, QueryBuilder};

use storerate_core::query::StoreField;
use storerate_core::{ListQuery, Page, Pagination, Role, StoreId, UserId};

use super::{
    PgRepository, RepositoryError, StoreRepository, conflict, count, parse_stored_email,
    push_filters, push_order_and_page, store_column,
};
use crate::models::{NewStore, Store, StoreChanges, UserRef};

const STORE_SELECT: &str = r"
    SELECT s.id, s.name, s.email, s.address, s.owner_id,
           u.name AS owner_name, u.email AS owner_email,
           s.created_at, s.updated_at
    FROM stores s
    JOIN users u ON u.id = s.owner_id";

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` store queries.
#[derive(Debug, sqlx::FromRow)]
struct StoreRow {
    id: i32,
    name: String,
    email: String,
    address: String,
    owner_id: i32,
    owner_name: String,
    owner_email: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<StoreRow> for Store {
    type Error = RepositoryError;

    fn try_from(row: StoreRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: StoreId::new(row.id),
            name: row.name,
            email: parse_stored_email(&row.email)?,
            address: row.address,
            owner: UserRef {
                id: UserId::new(row.owner_id),
                name: row.owner_name,
                email: parse_stored_email(&row.owner_email)?,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_stores(rows: Vec<StoreRow>) -> Result<Vec<Store>, RepositoryError> {
    rows.into_iter().map(TryInto::try_into).collect()
}

/// Check, under a shared row lock held until commit, that `owner_id` is an
/// existing OWNER. The lock keeps the owner's role fixed while the store row
/// referencing them is written.
async fn lock_owner(conn: &mut PgConnection, owner_id: UserId) -> Result<(), RepositoryError> {
    let role: Option<Role> = sqlx::query_scalar("SELECT role FROM users WHERE id = $1 FOR SHARE")
        .bind(owner_id)
        .fetch_optional(conn)
        .await?;

    match role {
        Some(Role::Owner) => Ok(()),
        _ => Err(RepositoryError::InvalidReference(
            conflict::INVALID_OWNER.to_owned(),
        )),
    }
}

async fn fetch_store(conn: &mut PgConnection, id: StoreId) -> Result<Store, RepositoryError> {
    let row = sqlx::query_as::<_, StoreRow>(&format!("{STORE_SELECT} WHERE s.id = $1"))
        .bind(id)
        .fetch_one(conn)
        .await?;
    row.try_into()
}

// =============================================================================
// Repository
// =============================================================================

#[async_trait]
impl StoreRepository for PgRepository {
    async fn find_store(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(&format!("{STORE_SELECT} WHERE s.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list_stores(
        &self,
        query: &ListQuery<StoreField>,
    ) -> Result<Page<Store>, RepositoryError> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM stores s");
        push_filters(&mut count_qb, &query.filters, store_column);
        let total = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut qb = QueryBuilder::<Postgres>::new(STORE_SELECT);
        push_filters(&mut qb, &query.filters, store_column);
        push_order_and_page(&mut qb, query, store_column, StoreField::is_free_text, "s.id");
        let rows = qb
            .build_query_as::<StoreRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items: into_stores(rows)?,
            pagination: Pagination::new(count(total), query.page),
        })
    }

    async fn recent_stores(&self, limit: u32) -> Result<Vec<Store>, RepositoryError> {
        let rows = sqlx::query_as::<_, StoreRow>(&format!(
            "{STORE_SELECT} ORDER BY s.created_at DESC, s.id DESC LIMIT $1"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        into_stores(rows)
    }

    async fn stores_by_owner(&self, owner_id: UserId) -> Result<Vec<Store>, RepositoryError> {
        let rows = sqlx::query_as::<_, StoreRow>(&format!(
            "{STORE_SELECT} WHERE s.owner_id = $1 ORDER BY s.name, s.id"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        into_stores(rows)
    }

    async fn stores_by_ids(&self, ids: &[StoreId]) -> Result<Vec<Store>, RepositoryError> {
        let ids: Vec<i32> = ids.iter().map(|id| id.as_i32()).collect();
        let rows = sqlx::query_as::<_, StoreRow>(&format!(
            "{STORE_SELECT} WHERE s.id = ANY($1) ORDER BY s.id"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        into_stores(rows)
    }

    async fn count_stores(&self) -> Result<u64, RepositoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stores")
            .fetch_one(&self.pool)
            .await?;
        Ok(count(total))
    }

    async fn create_store(&self, store: NewStore) -> Result<Store, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        lock_owner(&mut tx, store.owner_id).await?;

        let id: StoreId = sqlx::query_scalar(
            r"
            INSERT INTO stores (name, email, address, owner_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(store.name.as_str())
        .bind(store.email.as_str())
        .bind(store.address.as_str())
        .bind(store.owner_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, conflict::STORE_EMAIL_EXISTS))?;

        let created = fetch_store(&mut tx, id).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn update_store(
        &self,
        id: StoreId,
        changes: StoreChanges,
    ) -> Result<Store, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if let Some(owner_id) = changes.owner_id {
            lock_owner(&mut tx, owner_id).await?;
        }

        let updated: Option<StoreId> = sqlx::query_scalar(
            r"
            UPDATE stores
            SET name = $1, email = $2, address = $3,
                owner_id = COALESCE($4, owner_id), updated_at = NOW()
            WHERE id = $5
            RETURNING id
            ",
        )
        .bind(changes.name.as_str())
        .bind(changes.email.as_str())
        .bind(changes.address.as_str())
        .bind(changes.owner_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, conflict::STORE_EMAIL_EXISTS))?;

        let id = updated.ok_or(RepositoryError::NotFound)?;
        let store = fetch_store(&mut tx, id).await?;
        tx.commit().await?;
        Ok(store)
    }

    async fn delete_store(&self, id: StoreId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM stores WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
