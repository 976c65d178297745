//! The rating ledger: one rating per (user, store).

use serde::Serialize;
use tracing::instrument;

use storerate_core::aggregate;
use storerate_core::{
    Action, Page, PageRequest, Pagination, Principal, RatingId, Role, StoreId, UserId, authorize,
};

use super::or_not_found;
use crate::db::{Repository, RepositoryError};
use crate::error::{AppError, Result};
use crate::models::{RatingView, SampleScope, StoreRef, SubmitRatingRequest, UserRef};

/// The result of a submission.
#[derive(Debug, Clone)]
pub struct Submission {
    pub rating: RatingView,
    /// Whether an existing rating was overwritten.
    pub was_update: bool,
}

/// A page of a store's ratings plus store-wide statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRatings {
    pub ratings: Vec<RatingView>,
    /// Average over every rating of the store, not just this page.
    pub average_rating: f64,
    pub total_ratings: u64,
    pub pagination: Pagination,
}

pub struct RatingService<'a> {
    repo: &'a dyn Repository,
}

impl<'a> RatingService<'a> {
    #[must_use]
    pub const fn new(repo: &'a dyn Repository) -> Self {
        Self { repo }
    }

    /// Rate a store, overwriting the caller's previous rating of it.
    ///
    /// # Errors
    ///
    /// `Forbidden` unless USER, `Validation` for a value outside 1-5,
    /// `NotFound` for an unknown store.
    #[instrument(skip(self, principal, request), fields(caller = %principal.id, store_id = request.store_id))]
    pub async fn submit(
        &self,
        principal: &Principal,
        request: SubmitRatingRequest,
    ) -> Result<Submission> {
        authorize(principal, Action::SubmitRating)?;
        let (store_id, value) = request.validate()?;

        let store = self
            .repo
            .find_store(store_id)
            .await?
            .ok_or_else(|| AppError::not_found("Store"))?;

        let (rating, was_update) = self
            .repo
            .upsert_rating(principal.id, store_id, value)
            .await
            .map_err(|e| match e {
                // the store was deleted between lookup and write
                RepositoryError::InvalidReference(_) => AppError::not_found("Store"),
                other => other.into(),
            })?;

        tracing::info!(
            rating_id = %rating.id,
            value = %rating.value,
            was_update,
            "Rating submitted"
        );

        Ok(Submission {
            rating: RatingView {
                rating,
                user: UserRef::from(principal),
                store: StoreRef {
                    id: store.id,
                    name: store.name,
                    address: store.address,
                },
            },
            was_update,
        })
    }

    /// Delete a rating.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `Forbidden` unless ADMIN or the author.
    #[instrument(skip(self, principal), fields(caller = %principal.id))]
    pub async fn delete(&self, principal: &Principal, id: RatingId) -> Result<()> {
        let rating = self
            .repo
            .find_rating(id)
            .await?
            .ok_or_else(|| AppError::not_found("Rating"))?;
        authorize(
            principal,
            Action::DeleteRating {
                author_id: rating.user_id,
            },
        )?;

        self.repo
            .delete_rating(id)
            .await
            .map_err(or_not_found("Rating"))?;
        tracing::info!(rating_id = %id, "Rating deleted");
        Ok(())
    }

    /// Every rating written by `user_id`, newest first.
    ///
    /// # Errors
    ///
    /// `Forbidden` unless ADMIN or `user_id` is the caller.
    #[instrument(skip(self, principal), fields(caller = %principal.id))]
    pub async fn list_for_user(
        &self,
        principal: &Principal,
        user_id: UserId,
    ) -> Result<Vec<RatingView>> {
        authorize(principal, Action::ViewUserRatings { user_id })?;
        Ok(self.repo.ratings_by_user(user_id).await?)
    }

    /// One page of a store's ratings, newest first.
    ///
    /// USER callers only see their own rating rows; the average and total
    /// always cover the whole store.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown store, `Forbidden` for an OWNER of another
    /// store.
    #[instrument(skip(self, principal), fields(caller = %principal.id))]
    pub async fn list_for_store(
        &self,
        principal: &Principal,
        store_id: StoreId,
        page: PageRequest,
    ) -> Result<StoreRatings> {
        let store = self
            .repo
            .find_store(store_id)
            .await?
            .ok_or_else(|| AppError::not_found("Store"))?;
        authorize(
            principal,
            Action::ViewStoreRatings {
                owner_id: store.owner_id(),
            },
        )?;

        let author = (principal.role == Role::User).then_some(principal.id);
        let Page { items, pagination } = self
            .repo
            .ratings_for_store(store_id, author, page)
            .await?;

        let samples = self
            .repo
            .rating_samples(&SampleScope::Stores(vec![store_id]))
            .await?;
        let values: Vec<_> = samples.into_iter().map(|s| s.value).collect();

        Ok(StoreRatings {
            ratings: items,
            average_rating: aggregate::average(&values),
            total_ratings: values.len() as u64,
            pagination,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use storerate_core::{Address, DisplayName, Email, RatingValue};

    use super::*;
    use crate::db::{MemoryRepository, RatingRepository, StoreRepository, UserRepository};
    use crate::models::{NewStore, NewUser, User};

    struct Fixture {
        repo: MemoryRepository,
        admin: User,
        owner: User,
        other_owner: User,
        rater: User,
        other_rater: User,
        store: StoreId,
    }

    async fn user(repo: &MemoryRepository, email: &str, role: Role) -> User {
        repo.create_user(NewUser {
            name: DisplayName::parse("Reasonably Long Test Person").unwrap(),
            email: Email::parse(email).unwrap(),
            password_hash: "hash".to_owned(),
            address: Address::parse("1 Main Street").unwrap(),
            role,
        })
        .await
        .unwrap()
    }

    async fn fixture() -> Fixture {
        let repo = MemoryRepository::new();
        let admin = user(&repo, "admin@example.com", Role::Admin).await;
        let owner = user(&repo, "owner@example.com", Role::Owner).await;
        let other_owner = user(&repo, "other-owner@example.com", Role::Owner).await;
        let rater = user(&repo, "rater@example.com", Role::User).await;
        let other_rater = user(&repo, "other-rater@example.com", Role::User).await;
        let store = repo
            .create_store(NewStore {
                name: DisplayName::parse("Amazing Electronics Store and More").unwrap(),
                email: Email::parse("info@amazingstore.com").unwrap(),
                address: Address::parse("100 Electronics Boulevard").unwrap(),
                owner_id: owner.id,
            })
            .await
            .unwrap()
            .id;
        Fixture {
            repo,
            admin,
            owner,
            other_owner,
            rater,
            other_rater,
            store,
        }
    }

    fn submit(store: StoreId, value: i64) -> SubmitRatingRequest {
        SubmitRatingRequest {
            store_id: store.as_i32(),
            value,
        }
    }

    #[tokio::test]
    async fn test_first_submit_creates_then_updates() {
        let f = fixture().await;
        let service = RatingService::new(&f.repo);

        let first = service
            .submit(&f.rater.principal(), submit(f.store, 5))
            .await
            .unwrap();
        assert!(!first.was_update);
        assert_eq!(first.rating.store.name, "Amazing Electronics Store and More");

        let second = service
            .submit(&f.rater.principal(), submit(f.store, 3))
            .await
            .unwrap();
        assert!(second.was_update);
        assert_eq!(second.rating.rating.id, first.rating.rating.id);
        assert_eq!(f.repo.count_ratings().await.unwrap(), 1);

        let listing = service
            .list_for_store(&f.admin.principal(), f.store, PageRequest::default())
            .await
            .unwrap();
        assert!((listing.average_rating - 3.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_only_users_submit() {
        let f = fixture().await;
        let service = RatingService::new(&f.repo);
        for principal in [f.admin.principal(), f.owner.principal()] {
            let err = service
                .submit(&principal, submit(f.store, 4))
                .await
                .unwrap_err();
            assert!(
                matches!(err, AppError::Forbidden(msg) if msg == "Only normal users can submit ratings")
            );
        }
    }

    #[tokio::test]
    async fn test_submit_validates_then_checks_store() {
        let f = fixture().await;
        let service = RatingService::new(&f.repo);

        let err = service
            .submit(&f.rater.principal(), submit(f.store, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = service
            .submit(&f.rater.principal(), submit(StoreId::new(999), 4))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(msg) if msg == "Store not found"));
    }

    #[tokio::test]
    async fn test_owner_only_sees_own_store() {
        let f = fixture().await;
        let service = RatingService::new(&f.repo);

        service
            .list_for_store(&f.owner.principal(), f.store, PageRequest::default())
            .await
            .unwrap();
        let err = service
            .list_for_store(&f.other_owner.principal(), f.store, PageRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_user_sees_own_rows_but_store_wide_average() {
        let f = fixture().await;
        let service = RatingService::new(&f.repo);
        f.repo
            .upsert_rating(f.rater.id, f.store, RatingValue::new(5).unwrap())
            .await
            .unwrap();
        f.repo
            .upsert_rating(f.other_rater.id, f.store, RatingValue::new(2).unwrap())
            .await
            .unwrap();

        let listing = service
            .list_for_store(&f.rater.principal(), f.store, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(listing.ratings.len(), 1);
        assert_eq!(listing.ratings.first().unwrap().user.id, f.rater.id);
        assert_eq!(listing.total_ratings, 2);
        assert!((listing.average_rating - 3.5).abs() < f64::EPSILON);

        let listing = service
            .list_for_store(&f.owner.principal(), f.store, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(listing.ratings.len(), 2);
        assert_eq!(listing.pagination.total, 2);
    }

    #[tokio::test]
    async fn test_delete_own_or_admin() {
        let f = fixture().await;
        let service = RatingService::new(&f.repo);
        let (rating, _) = f
            .repo
            .upsert_rating(f.rater.id, f.store, RatingValue::new(4).unwrap())
            .await
            .unwrap();

        for principal in [f.other_rater.principal(), f.owner.principal()] {
            let err = service.delete(&principal, rating.id).await.unwrap_err();
            assert!(matches!(err, AppError::Forbidden(_)));
        }
        service.delete(&f.rater.principal(), rating.id).await.unwrap();

        let err = service
            .delete(&f.admin.principal(), rating.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(msg) if msg == "Rating not found"));
    }

    #[tokio::test]
    async fn test_list_for_user_is_self_or_admin() {
        let f = fixture().await;
        let service = RatingService::new(&f.repo);
        f.repo
            .upsert_rating(f.rater.id, f.store, RatingValue::new(4).unwrap())
            .await
            .unwrap();

        assert_eq!(
            service
                .list_for_user(&f.rater.principal(), f.rater.id)
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            service
                .list_for_user(&f.admin.principal(), f.rater.id)
                .await
                .unwrap()
                .len(),
            1
        );
        let err = service
            .list_for_user(&f.other_rater.principal(), f.rater.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
