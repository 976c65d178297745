//! Store administration and listing.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::instrument;

use storerate_core::aggregate;
use storerate_core::query::StoreField;
use storerate_core::{Action, ListQuery, Page, Principal, RatingValue, Role, StoreId, authorize};

use super::or_not_found;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{RatingSample, SampleScope, Store, StoreRequest};

/// A store with its live rating statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSummary {
    #[serde(flatten)]
    pub store: Store,
    pub average_rating: f64,
    pub total_ratings: u64,
    /// The calling USER's own rating of this store. Always `null` for
    /// other roles.
    pub user_rating: Option<RatingValue>,
}

/// Per-store values and the caller's own value, from one batch of samples.
struct Annotations {
    values: BTreeMap<StoreId, Vec<RatingValue>>,
    mine: BTreeMap<StoreId, RatingValue>,
}

impl Annotations {
    fn new(principal: &Principal, samples: Vec<RatingSample>) -> Self {
        let mine = if principal.role == Role::User {
            samples
                .iter()
                .filter(|s| s.user_id == principal.id)
                .map(|s| (s.store_id, s.value))
                .collect()
        } else {
            BTreeMap::new()
        };
        let values = aggregate::group_by(samples.into_iter().map(|s| (s.store_id, s.value)));
        Self { values, mine }
    }

    fn summarize(&self, store: Store) -> StoreSummary {
        let values = self.values.get(&store.id).map_or(&[][..], Vec::as_slice);
        StoreSummary {
            average_rating: aggregate::average(values),
            total_ratings: values.len() as u64,
            user_rating: self.mine.get(&store.id).copied(),
            store,
        }
    }
}

pub struct StoreService<'a> {
    repo: &'a dyn Repository,
}

impl<'a> StoreService<'a> {
    #[must_use]
    pub const fn new(repo: &'a dyn Repository) -> Self {
        Self { repo }
    }

    /// One page of stores with averages, counts and the caller's own rating.
    ///
    /// # Errors
    ///
    /// `Forbidden` if the gate refuses `ListStores`.
    #[instrument(skip(self, principal, query), fields(caller = %principal.id))]
    pub async fn list(
        &self,
        principal: &Principal,
        query: &ListQuery<StoreField>,
    ) -> Result<Page<StoreSummary>> {
        authorize(principal, Action::ListStores)?;

        let page = self.repo.list_stores(query).await?;
        let ids: Vec<StoreId> = page.items.iter().map(|s| s.id).collect();
        let samples = if ids.is_empty() {
            Vec::new()
        } else {
            self.repo.rating_samples(&SampleScope::Stores(ids)).await?
        };

        let annotations = Annotations::new(principal, samples);
        Ok(page.map(|store| annotations.summarize(store)))
    }

    /// A single store with its statistics.
    ///
    /// # Errors
    ///
    /// `Forbidden` if the gate refuses `ListStores`, `NotFound` for an
    /// unknown id.
    #[instrument(skip(self, principal), fields(caller = %principal.id))]
    pub async fn get(&self, principal: &Principal, id: StoreId) -> Result<StoreSummary> {
        authorize(principal, Action::ListStores)?;

        let store = self
            .repo
            .find_store(id)
            .await?
            .ok_or_else(|| AppError::not_found("Store"))?;
        let samples = self
            .repo
            .rating_samples(&SampleScope::Stores(vec![id]))
            .await?;

        Ok(Annotations::new(principal, samples).summarize(store))
    }

    /// Create a store owned by an existing OWNER.
    ///
    /// # Errors
    ///
    /// `Forbidden` unless ADMIN, `Validation`, or `Conflict` for a taken
    /// email or an owner id that is not an OWNER.
    #[instrument(skip(self, principal, request), fields(caller = %principal.id))]
    pub async fn create(&self, principal: &Principal, request: StoreRequest) -> Result<Store> {
        authorize(principal, Action::ManageStores)?;
        let new_store = request.validate_new()?;

        let store = self.repo.create_store(new_store).await?;
        tracing::info!(store_id = %store.id, owner_id = %store.owner_id(), "Store created");
        Ok(store)
    }

    /// Replace a store's fields. An absent owner id keeps the current owner.
    ///
    /// # Errors
    ///
    /// As [`Self::create`], plus `NotFound` for an unknown id.
    #[instrument(skip(self, principal, request), fields(caller = %principal.id))]
    pub async fn update(
        &self,
        principal: &Principal,
        id: StoreId,
        request: StoreRequest,
    ) -> Result<Store> {
        authorize(principal, Action::ManageStores)?;
        let changes = request.validate_changes()?;

        let store = self
            .repo
            .update_store(id, changes)
            .await
            .map_err(or_not_found("Store"))?;
        tracing::info!(store_id = %store.id, owner_id = %store.owner_id(), "Store updated");
        Ok(store)
    }

    /// Delete a store and its ratings.
    ///
    /// # Errors
    ///
    /// `Forbidden` unless ADMIN, `NotFound` for an unknown id.
    #[instrument(skip(self, principal), fields(caller = %principal.id))]
    pub async fn delete(&self, principal: &Principal, id: StoreId) -> Result<()> {
        authorize(principal, Action::ManageStores)?;

        self.repo
            .delete_store(id)
            .await
            .map_err(or_not_found("Store"))?;
        tracing::info!(store_id = %id, "Store deleted");
        Ok(())
    }
}
