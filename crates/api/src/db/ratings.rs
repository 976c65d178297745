//! `PostgreSQL` rating queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use storerate_core::{
    Page, PageRequest, Pagination, RatingId, RatingValue, StoreId, UserId,
};

use super::{PgRepository, RatingRepository, RepositoryError, count, parse_stored_email};
use crate::models::{Rating, RatingSample, RatingView, SampleScope, StoreRef, UserRef};

const RATING_COLUMNS: &str = "id, value, user_id, store_id, created_at, updated_at";

const VIEW_SELECT: &str = r"
    SELECT r.id, r.value, r.user_id, r.store_id, r.created_at, r.updated_at,
           u.name AS user_name, u.email AS user_email,
           s.name AS store_name, s.address AS store_address
    FROM ratings r
    JOIN users u ON u.id = r.user_id
    JOIN stores s ON s.id = r.store_id";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct RatingRow {
    id: i32,
    value: i16,
    user_id: i32,
    store_id: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RatingRow> for Rating {
    type Error = RepositoryError;

    fn try_from(row: RatingRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: RatingId::new(row.id),
            value: stored_value(row.value)?,
            user_id: UserId::new(row.user_id),
            store_id: StoreId::new(row.store_id),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// [`RatingRow`] plus the `xmax = 0` marker of an upsert.
#[derive(Debug, sqlx::FromRow)]
struct UpsertRow {
    #[sqlx(flatten)]
    rating: RatingRow,
    inserted: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct RatingViewRow {
    #[sqlx(flatten)]
    rating: RatingRow,
    user_name: String,
    user_email: String,
    store_name: String,
    store_address: String,
}

impl TryFrom<RatingViewRow> for RatingView {
    type Error = RepositoryError;

    fn try_from(row: RatingViewRow) -> Result<Self, Self::Error> {
        let rating = Rating::try_from(row.rating)?;
        Ok(Self {
            user: UserRef {
                id: rating.user_id,
                name: row.user_name,
                email: parse_stored_email(&row.user_email)?,
            },
            store: StoreRef {
                id: rating.store_id,
                name: row.store_name,
                address: row.store_address,
            },
            rating,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SampleRow {
    store_id: i32,
    owner_id: i32,
    user_id: i32,
    value: i16,
}

impl TryFrom<SampleRow> for RatingSample {
    type Error = RepositoryError;

    fn try_from(row: SampleRow) -> Result<Self, Self::Error> {
        Ok(Self {
            store_id: StoreId::new(row.store_id),
            owner_id: UserId::new(row.owner_id),
            user_id: UserId::new(row.user_id),
            value: stored_value(row.value)?,
        })
    }
}

fn stored_value(raw: i16) -> Result<RatingValue, RepositoryError> {
    RatingValue::try_from(raw)
        .map_err(|_| RepositoryError::DataCorruption(format!("rating value {raw} out of range")))
}

fn into_views(rows: Vec<RatingViewRow>) -> Result<Vec<RatingView>, RepositoryError> {
    rows.into_iter().map(TryInto::try_into).collect()
}

// =============================================================================
// Repository
// =============================================================================

#[async_trait]
impl RatingRepository for PgRepository {
    async fn upsert_rating(
        &self,
        user_id: UserId,
        store_id: StoreId,
        value: RatingValue,
    ) -> Result<(Rating, bool), RepositoryError> {
        // xmax is zero only for a freshly inserted tuple.
        let row = sqlx::query_as::<_, UpsertRow>(&format!(
            r"
            INSERT INTO ratings (user_id, store_id, value)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, store_id)
            DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            RETURNING {RATING_COLUMNS}, (xmax = 0) AS inserted
            "
        ))
        .bind(user_id)
        .bind(store_id)
        .bind(i16::from(value))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "rating already exists"))?;

        let was_update = !row.inserted;
        Ok((row.rating.try_into()?, was_update))
    }

    async fn find_rating(&self, id: RatingId) -> Result<Option<Rating>, RepositoryError> {
        let row = sqlx::query_as::<_, RatingRow>(&format!(
            "SELECT {RATING_COLUMNS} FROM ratings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn delete_rating(&self, id: RatingId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM ratings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn ratings_by_user(&self, user_id: UserId) -> Result<Vec<RatingView>, RepositoryError> {
        let rows = sqlx::query_as::<_, RatingViewRow>(&format!(
            "{VIEW_SELECT} WHERE r.user_id = $1 ORDER BY r.created_at DESC, r.id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        into_views(rows)
    }

    async fn ratings_for_store(
        &self,
        store_id: StoreId,
        author: Option<UserId>,
        page: PageRequest,
    ) -> Result<Page<RatingView>, RepositoryError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM ratings WHERE store_id = $1 AND ($2::int IS NULL OR user_id = $2)",
        )
        .bind(store_id)
        .bind(author)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, RatingViewRow>(&format!(
            r"{VIEW_SELECT}
            WHERE r.store_id = $1 AND ($2::int IS NULL OR r.user_id = $2)
            ORDER BY r.created_at DESC, r.id DESC
            LIMIT $3 OFFSET $4"
        ))
        .bind(store_id)
        .bind(author)
        .bind(i64::from(page.limit()))
        .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            items: into_views(rows)?,
            pagination: Pagination::new(count(total), page),
        })
    }

    async fn recent_ratings(&self, limit: u32) -> Result<Vec<RatingView>, RepositoryError> {
        let rows = sqlx::query_as::<_, RatingViewRow>(&format!(
            "{VIEW_SELECT} ORDER BY r.created_at DESC, r.id DESC LIMIT $1"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        into_views(rows)
    }

    async fn count_ratings(&self) -> Result<u64, RepositoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ratings")
            .fetch_one(&self.pool)
            .await?;
        Ok(count(total))
    }

    async fn rating_samples(
        &self,
        scope: &SampleScope,
    ) -> Result<Vec<RatingSample>, RepositoryError> {
        const BASE: &str = r"
            SELECT r.store_id, s.owner_id, r.user_id, r.value
            FROM ratings r
            JOIN stores s ON s.id = r.store_id";

        let rows = match scope {
            SampleScope::All => {
                sqlx::query_as::<_, SampleRow>(BASE)
                    .fetch_all(&self.pool)
                    .await?
            }
            SampleScope::Stores(ids) => {
                let ids: Vec<i32> = ids.iter().map(|id| id.as_i32()).collect();
                sqlx::query_as::<_, SampleRow>(&format!("{BASE} WHERE r.store_id = ANY($1)"))
                    .bind(ids)
                    .fetch_all(&self.pool)
                    .await?
            }
            SampleScope::Owners(ids) => {
                let ids: Vec<i32> = ids.iter().map(|id| id.as_i32()).collect();
                sqlx::query_as::<_, SampleRow>(&format!("{BASE} WHERE s.owner_id = ANY($1)"))
                    .bind(ids)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.into_iter().map(TryInto::try_into).collect()
    }
}
