//! Rating domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storerate_core::{RatingId, RatingValue, StoreId, UserId, ValidationErrors};

use super::UserRef;

/// A single user's rating of a single store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub id: RatingId,
    pub value: RatingValue,
    pub user_id: UserId,
    pub store_id: StoreId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The identifying subset of a store embedded in rating payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreRef {
    pub id: StoreId,
    pub name: String,
    pub address: String,
}

/// A rating with its author and store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RatingView {
    #[serde(flatten)]
    pub rating: Rating,
    pub user: UserRef,
    pub store: StoreRef,
}

/// The minimum needed to aggregate a rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingSample {
    pub store_id: StoreId,
    pub owner_id: UserId,
    pub user_id: UserId,
    pub value: RatingValue,
}

/// Which ratings to load as samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleScope {
    All,
    Stores(Vec<StoreId>),
    Owners(Vec<UserId>),
}

impl SampleScope {
    /// Whether `sample` falls inside this scope.
    #[must_use]
    pub fn contains(&self, sample: &RatingSample) -> bool {
        match self {
            Self::All => true,
            Self::Stores(ids) => ids.contains(&sample.store_id),
            Self::Owners(ids) => ids.contains(&sample.owner_id),
        }
    }
}

/// `POST /api/ratings`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRatingRequest {
    pub store_id: i32,
    pub value: i64,
}

impl SubmitRatingRequest {
    /// # Errors
    ///
    /// Returns a `value` field error outside 1-5.
    pub fn validate(&self) -> Result<(StoreId, RatingValue), ValidationErrors> {
        let value = RatingValue::new(self.value)
            .map_err(|e| ValidationErrors::single("value", e.to_string()))?;
        Ok((StoreId::new(self.store_id), value))
    }
}
