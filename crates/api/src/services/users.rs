//! User administration and listing.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::instrument;

use storerate_core::aggregate::{self, StoreStats};
use storerate_core::query::UserField;
use storerate_core::{Action, ListQuery, Page, Principal, Role, UserId, authorize};

use super::auth::create_account;
use super::or_not_found;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{CreateUserRequest, RatingSample, SampleScope, UpdateUserRequest, User};

/// A user as listed, with OWNER rows annotated by their stores' average.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(flatten)]
    pub user: User,
    /// Present only for OWNER rows; `null` when their stores have no ratings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<Option<f64>>,
}

pub struct UserService<'a> {
    repo: &'a dyn Repository,
}

impl<'a> UserService<'a> {
    #[must_use]
    pub const fn new(repo: &'a dyn Repository) -> Self {
        Self { repo }
    }

    /// One page of users.
    ///
    /// # Errors
    ///
    /// `Forbidden` if the gate refuses `ListUsers`.
    #[instrument(skip(self, principal, query), fields(caller = %principal.id))]
    pub async fn list(
        &self,
        principal: &Principal,
        query: &ListQuery<UserField>,
    ) -> Result<Page<UserSummary>> {
        authorize(principal, Action::ListUsers)?;

        let page = self.repo.list_users(query).await?;
        let owners: Vec<UserId> = page
            .items
            .iter()
            .filter(|u| u.role == Role::Owner)
            .map(|u| u.id)
            .collect();

        let mut by_owner: BTreeMap<UserId, Vec<RatingSample>> = BTreeMap::new();
        if !owners.is_empty() {
            for sample in self.repo.rating_samples(&SampleScope::Owners(owners)).await? {
                by_owner.entry(sample.owner_id).or_default().push(sample);
            }
        }

        Ok(page.map(|user| {
            let average_rating = (user.role == Role::Owner).then(|| {
                by_owner
                    .get(&user.id)
                    .and_then(|samples| owner_average(samples))
            });
            UserSummary {
                user,
                average_rating,
            }
        }))
    }

    /// A single user, annotated like a listing row.
    ///
    /// # Errors
    ///
    /// `Forbidden` if the gate refuses `ListUsers`, `NotFound` for an
    /// unknown id.
    #[instrument(skip(self, principal), fields(caller = %principal.id))]
    pub async fn get(&self, principal: &Principal, id: UserId) -> Result<UserSummary> {
        authorize(principal, Action::ListUsers)?;

        let user = self
            .repo
            .find_user(id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        let average_rating = if user.role == Role::Owner {
            let samples = self
                .repo
                .rating_samples(&SampleScope::Owners(vec![id]))
                .await?;
            Some(owner_average(&samples))
        } else {
            None
        };

        Ok(UserSummary {
            user,
            average_rating,
        })
    }

    /// Create an account of any role.
    ///
    /// # Errors
    ///
    /// `Forbidden` unless ADMIN, `Validation` for bad fields, `Conflict`
    /// when the email is taken.
    #[instrument(skip(self, principal, request), fields(caller = %principal.id))]
    pub async fn create(&self, principal: &Principal, request: CreateUserRequest) -> Result<User> {
        authorize(principal, Action::ManageUsers)?;
        let (profile, role) = request.validate()?;

        let user = create_account(self.repo, profile, role).await?;
        tracing::info!(user_id = %user.id, role = %user.role, "User created");
        Ok(user)
    }

    /// Replace a user's name, email, address and role.
    ///
    /// # Errors
    ///
    /// `Forbidden` unless ADMIN, `Validation`, `NotFound`, or `Conflict` for
    /// a taken email or an OWNER who still owns stores losing the role.
    #[instrument(skip(self, principal, request), fields(caller = %principal.id))]
    pub async fn update(
        &self,
        principal: &Principal,
        id: UserId,
        request: UpdateUserRequest,
    ) -> Result<User> {
        authorize(principal, Action::ManageUsers)?;
        let changes = request.validate()?;

        let user = self
            .repo
            .update_user(id, changes)
            .await
            .map_err(or_not_found("User"))?;
        tracing::info!(user_id = %user.id, role = %user.role, "User updated");
        Ok(user)
    }

    /// Delete a user and their ratings.
    ///
    /// # Errors
    ///
    /// `Forbidden` unless ADMIN, `NotFound`, or `Conflict` while the user
    /// owns stores.
    #[instrument(skip(self, principal), fields(caller = %principal.id))]
    pub async fn delete(&self, principal: &Principal, id: UserId) -> Result<()> {
        authorize(principal, Action::ManageUsers)?;

        self.repo
            .delete_user(id)
            .await
            .map_err(or_not_found("User"))?;
        tracing::info!(user_id = %id, "User deleted");
        Ok(())
    }
}

/// Rounded average over an owner's stores, each weighted by its rating count.
fn owner_average(samples: &[RatingSample]) -> Option<f64> {
    let per_store = aggregate::group_by(samples.iter().map(|s| (s.store_id, s.value)));
    let stats: Vec<StoreStats> = per_store
        .iter()
        .map(|(store_id, values)| StoreStats::from_values(*store_id, values))
        .collect();
    aggregate::weighted_owner_average(&stats).map(aggregate::round2)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use storerate_core::query::Matcher;
    use storerate_core::{Address, DisplayName, Email, PageRequest, RatingValue, StoreId};

    use super::*;
    use crate::db::{MemoryRepository, RatingRepository, StoreRepository, UserRepository};
    use crate::models::{NewStore, NewUser};

    async fn seed_user(repo: &MemoryRepository, email: &str, role: Role) -> User {
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

    async fn seed_store(repo: &MemoryRepository, email: &str, owner: UserId) -> StoreId {
        repo.create_store(NewStore {
            name: DisplayName::parse("Reasonably Long Store Name").unwrap(),
            email: Email::parse(email).unwrap(),
            address: Address::parse("2 Market Street").unwrap(),
            owner_id: owner,
        })
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn test_list_annotates_owners_only() {
        let repo = MemoryRepository::new();
        let admin = seed_user(&repo, "admin@example.com", Role::Admin).await;
        let owner = seed_user(&repo, "owner@example.com", Role::Owner).await;
        let idle_owner = seed_user(&repo, "idle@example.com", Role::Owner).await;
        let rater = seed_user(&repo, "rater@example.com", Role::User).await;

        let a = seed_store(&repo, "a@example.com", owner.id).await;
        let b = seed_store(&repo, "b@example.com", owner.id).await;
        repo.upsert_rating(rater.id, a, RatingValue::new(5).unwrap())
            .await
            .unwrap();
        repo.upsert_rating(rater.id, b, RatingValue::new(2).unwrap())
            .await
            .unwrap();

        let service = UserService::new(&repo);
        let page = service
            .list(&admin.principal(), &ListQuery::default())
            .await
            .unwrap();

        let find = |id: UserId| page.items.iter().find(|s| s.user.id == id).unwrap();
        assert_eq!(find(owner.id).average_rating, Some(Some(3.5)));
        assert_eq!(find(idle_owner.id).average_rating, Some(None));
        assert_eq!(find(rater.id).average_rating, None);

        let json = serde_json::to_value(find(rater.id)).unwrap();
        assert!(json.get("averageRating").is_none());
        let json = serde_json::to_value(find(idle_owner.id)).unwrap();
        assert!(json["averageRating"].is_null());
    }

    #[tokio::test]
    async fn test_list_filters_role_with_pagination() {
        let repo = MemoryRepository::new();
        let admin = seed_user(&repo, "admin@example.com", Role::Admin).await;
        for i in 0..5 {
            seed_user(&repo, &format!("owner{i}@example.com"), Role::Owner).await;
        }

        let query = ListQuery::default()
            .filter(UserField::Role, Matcher::Exact("OWNER".to_owned()))
            .page(PageRequest::new(Some(1), Some(2)).unwrap());
        let page = UserService::new(&repo)
            .list(&admin.principal(), &query)
            .await
            .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.pagination.total, 5);
        assert_eq!(page.pagination.total_pages, 3);
    }

    #[tokio::test]
    async fn test_only_admin_creates_users() {
        let repo = MemoryRepository::new();
        let owner = seed_user(&repo, "owner@example.com", Role::Owner).await;
        let request = CreateUserRequest {
            name: "Another Reasonably Long Name".to_owned(),
            email: "new@example.com".to_owned(),
            password: "Admin@1234".to_owned(),
            address: String::new(),
            role: "USER".to_owned(),
        };
        let err = UserService::new(&repo)
            .create(&owner.principal(), request)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(msg) if msg == "Access denied. Admin only."));
        assert_eq!(repo.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_unknown_user_is_not_found() {
        let repo = MemoryRepository::new();
        let admin = seed_user(&repo, "admin@example.com", Role::Admin).await;
        let err = UserService::new(&repo)
            .delete(&admin.principal(), UserId::new(404))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(msg) if msg == "User not found"));
    }

    #[tokio::test]
    async fn test_get_owner_weighted_average() {
        let repo = MemoryRepository::new();
        let owner = seed_user(&repo, "owner@example.com", Role::Owner).await;
        let r1 = seed_user(&repo, "r1@example.com", Role::User).await;
        let r2 = seed_user(&repo, "r2@example.com", Role::User).await;
        let a = seed_store(&repo, "a@example.com", owner.id).await;
        let b = seed_store(&repo, "b@example.com", owner.id).await;

        // a: [5, 5], b: [2] -> (5*2 + 2*1) / 3 = 4.0
        repo.upsert_rating(r1.id, a, RatingValue::new(5).unwrap()).await.unwrap();
        repo.upsert_rating(r2.id, a, RatingValue::new(5).unwrap()).await.unwrap();
        repo.upsert_rating(r1.id, b, RatingValue::new(2).unwrap()).await.unwrap();

        let summary = UserService::new(&repo)
            .get(&r1.principal(), owner.id)
            .await
            .unwrap();
        assert_eq!(summary.average_rating, Some(Some(4.0)));
    }

    #[tokio::test]
    async fn test_list_and_get_agree_on_owner_average() {
        let repo = MemoryRepository::new();
        let admin = seed_user(&repo, "admin@example.com", Role::Admin).await;
        let owner = seed_user(&repo, "owner@example.com", Role::Owner).await;
        let a = seed_store(&repo, "a@example.com", owner.id).await;
        let b = seed_store(&repo, "b@example.com", owner.id).await;

        // a: [5, 4, 4], b: [1] -> 14 / 4 = 3.5
        for (i, (store, value)) in [(a, 5), (a, 4), (a, 4), (b, 1)].into_iter().enumerate() {
            let rater = seed_user(&repo, &format!("r{i}@example.com"), Role::User).await;
            repo.upsert_rating(rater.id, store, RatingValue::new(value).unwrap())
                .await
                .unwrap();
        }

        let service = UserService::new(&repo);
        let page = service
            .list(&admin.principal(), &ListQuery::default())
            .await
            .unwrap();
        let listed = page.items.iter().find(|s| s.user.id == owner.id).unwrap();
        let fetched = service.get(&admin.principal(), owner.id).await.unwrap();

        assert_eq!(listed.average_rating, Some(Some(3.5)));
        assert_eq!(listed.average_rating, fetched.average_rating);
    }
}
