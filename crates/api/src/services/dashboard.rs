//! Dashboard composition.
//!
//! Both dashboards are recomputed from storage on every call. Statistics are
//! aggregated in full precision from one batch of rating samples and rounded
//! only when a figure is placed into the response.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use storerate_core::aggregate::{self, StoreStats, TOP_STORES};
use storerate_core::{
    Action, Email, PageRequest, Principal, RatingId, RatingValue, Role, StoreId, authorize,
};

use crate::db::Repository;
use crate::error::Result;
use crate::models::{Rating, SampleScope, Store, User, UserRef};

const RECENT_USERS: u32 = 5;
const RECENT_STORES: u32 = 5;
const RECENT_RATINGS: u32 = 10;

// =============================================================================
// Admin dashboard
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub total_users: u64,
    pub total_stores: u64,
    pub total_ratings: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerName {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentStore {
    pub id: StoreId,
    pub name: String,
    pub email: Email,
    pub owner: OwnerName,
    pub average_rating: f64,
    pub total_ratings: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rater {
    pub name: String,
    pub email: Email,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreName {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentRating {
    pub id: RatingId,
    pub value: RatingValue,
    pub created_at: DateTime<Utc>,
    pub user: Rater,
    pub store: StoreName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoleCount {
    pub role: Role,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedStore {
    pub id: StoreId,
    pub name: String,
    pub owner: OwnerName,
    pub average_rating: f64,
    pub total_ratings: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    pub stats: Totals,
    pub recent_users: Vec<User>,
    pub recent_stores: Vec<RecentStore>,
    pub recent_ratings: Vec<RecentRating>,
    /// Always one entry per role, zero counts included.
    pub users_by_role: Vec<RoleCount>,
    pub top_rated_stores: Vec<RankedStore>,
}

// =============================================================================
// Owner dashboard
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreInfo {
    pub id: StoreId,
    pub name: String,
    pub email: Email,
    pub address: String,
}

impl From<&Store> for StoreInfo {
    fn from(store: &Store) -> Self {
        Self {
            id: store.id,
            name: store.name.clone(),
            email: store.email.clone(),
            address: store.address.clone(),
        }
    }
}

/// A rating on an owner's store, with the rater's id, name and email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerRating {
    #[serde(flatten)]
    pub rating: Rating,
    pub user: UserRef,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedStore {
    pub store: StoreInfo,
    pub average_rating: f64,
    pub total_ratings: u64,
    /// Keys `1` through `5`, always all present.
    pub rating_distribution: BTreeMap<u8, u64>,
    pub recent_ratings: Vec<OwnerRating>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub total_stores: u64,
    pub total_ratings: u64,
    /// Weighted by each store's rating count; `0` with no ratings.
    pub overall_average_rating: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OwnerDashboard {
    pub stores: Vec<OwnedStore>,
    pub summary: OwnerSummary,
}

// =============================================================================
// Service
// =============================================================================

pub struct DashboardService<'a> {
    repo: &'a dyn Repository,
}

impl<'a> DashboardService<'a> {
    #[must_use]
    pub const fn new(repo: &'a dyn Repository) -> Self {
        Self { repo }
    }

    /// System-wide figures for administrators.
    ///
    /// # Errors
    ///
    /// `Forbidden` unless ADMIN.
    #[instrument(skip(self, principal), fields(caller = %principal.id))]
    pub async fn admin(&self, principal: &Principal) -> Result<AdminDashboard> {
        authorize(principal, Action::ViewAdminDashboard)?;

        let stats = Totals {
            total_users: self.repo.count_users().await?,
            total_stores: self.repo.count_stores().await?,
            total_ratings: self.repo.count_ratings().await?,
        };

        let samples = self.repo.rating_samples(&SampleScope::All).await?;
        let per_store: BTreeMap<StoreId, StoreStats> =
            aggregate::group_by(samples.into_iter().map(|s| (s.store_id, s.value)))
                .into_iter()
                .map(|(id, values)| (id, StoreStats::from_values(id, &values)))
                .collect();
        let stats_of = |id: StoreId| {
            per_store
                .get(&id)
                .copied()
                .unwrap_or_else(|| StoreStats::from_values(id, &[]))
        };

        let recent_users = self.repo.recent_users(RECENT_USERS).await?;

        let recent_stores = self
            .repo
            .recent_stores(RECENT_STORES)
            .await?
            .into_iter()
            .map(|store| {
                let stats = stats_of(store.id);
                RecentStore {
                    id: store.id,
                    name: store.name,
                    email: store.email,
                    owner: OwnerName {
                        name: store.owner.name,
                    },
                    average_rating: aggregate::round2(stats.average),
                    total_ratings: stats.count,
                    created_at: store.created_at,
                }
            })
            .collect();

        let recent_ratings = self
            .repo
            .recent_ratings(RECENT_RATINGS)
            .await?
            .into_iter()
            .map(|view| RecentRating {
                id: view.rating.id,
                value: view.rating.value,
                created_at: view.rating.created_at,
                user: Rater {
                    name: view.user.name,
                    email: view.user.email,
                },
                store: StoreName {
                    name: view.store.name,
                },
            })
            .collect();

        let counted: BTreeMap<Role, u64> =
            self.repo.count_users_by_role().await?.into_iter().collect();
        let users_by_role = Role::ALL
            .iter()
            .map(|role| RoleCount {
                role: *role,
                count: counted.get(role).copied().unwrap_or(0),
            })
            .collect();

        let ranked = aggregate::rank_stores(per_store.values().copied(), TOP_STORES);
        let ids: Vec<StoreId> = ranked.iter().map(|s| s.store_id).collect();
        let mut stores: BTreeMap<StoreId, Store> = if ids.is_empty() {
            BTreeMap::new()
        } else {
            self.repo
                .stores_by_ids(&ids)
                .await?
                .into_iter()
                .map(|s| (s.id, s))
                .collect()
        };
        let top_rated_stores = ranked
            .iter()
            .filter_map(|stats| {
                let store = stores.remove(&stats.store_id)?;
                Some(RankedStore {
                    id: store.id,
                    name: store.name,
                    owner: OwnerName {
                        name: store.owner.name,
                    },
                    average_rating: aggregate::round2(stats.average),
                    total_ratings: stats.count,
                })
            })
            .collect();

        Ok(AdminDashboard {
            stats,
            recent_users,
            recent_stores,
            recent_ratings,
            users_by_role,
            top_rated_stores,
        })
    }

    /// Per-store breakdown for the calling OWNER's stores.
    ///
    /// # Errors
    ///
    /// `Forbidden` unless OWNER.
    #[instrument(skip(self, principal), fields(caller = %principal.id))]
    pub async fn owner(&self, principal: &Principal) -> Result<OwnerDashboard> {
        authorize(principal, Action::ViewOwnerDashboard)?;

        let owned = self.repo.stores_by_owner(principal.id).await?;
        let samples = self
            .repo
            .rating_samples(&SampleScope::Owners(vec![principal.id]))
            .await?;
        let grouped = aggregate::group_by(samples.into_iter().map(|s| (s.store_id, s.value)));

        let mut stores = Vec::with_capacity(owned.len());
        let mut per_store = Vec::with_capacity(owned.len());
        for store in &owned {
            let values = grouped.get(&store.id).map_or(&[][..], Vec::as_slice);
            let stats = StoreStats::from_values(store.id, values);
            per_store.push(stats);

            // the default page is the ten newest
            let recent = self
                .repo
                .ratings_for_store(store.id, None, PageRequest::default())
                .await?;
            let recent_ratings = recent
                .items
                .into_iter()
                .take(RECENT_RATINGS as usize)
                .map(|view| OwnerRating {
                    rating: view.rating,
                    user: view.user,
                })
                .collect();

            stores.push(OwnedStore {
                store: StoreInfo::from(store),
                average_rating: aggregate::average(values),
                total_ratings: stats.count,
                rating_distribution: aggregate::distribution(values),
                recent_ratings,
            });
        }

        let summary = OwnerSummary {
            total_stores: owned.len() as u64,
            total_ratings: per_store.iter().map(|s| s.count).sum(),
            overall_average_rating: aggregate::weighted_owner_average(&per_store)
                .map_or(0.0, aggregate::round2),
        };

        Ok(OwnerDashboard { stores, summary })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use storerate_core::{Address, DisplayName, UserId};

    use super::*;
    use crate::db::{MemoryRepository, RatingRepository, StoreRepository, UserRepository};
    use crate::error::AppError;
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

    async fn rate(repo: &MemoryRepository, user: UserId, store: StoreId, value: i64) {
        repo.upsert_rating(user, store, RatingValue::new(value).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_admin_dashboard_counts_and_ranking() {
        let repo = MemoryRepository::new();
        let admin = seed_user(&repo, "admin@example.com", Role::Admin).await;
        let owner = seed_user(&repo, "owner@example.com", Role::Owner).await;
        let r1 = seed_user(&repo, "r1@example.com", Role::User).await;
        let r2 = seed_user(&repo, "r2@example.com", Role::User).await;
        let a = seed_store(&repo, "a@example.com", owner.id).await;
        let b = seed_store(&repo, "b@example.com", owner.id).await;
        let unrated = seed_store(&repo, "c@example.com", owner.id).await;

        rate(&repo, r1.id, a, 4).await;
        rate(&repo, r2.id, a, 4).await;
        rate(&repo, r1.id, b, 5).await;

        let dashboard = DashboardService::new(&repo)
            .admin(&admin.principal())
            .await
            .unwrap();

        assert_eq!(
            dashboard.stats,
            Totals {
                total_users: 4,
                total_stores: 3,
                total_ratings: 3,
            }
        );
        let top: Vec<StoreId> = dashboard.top_rated_stores.iter().map(|s| s.id).collect();
        assert_eq!(top, vec![b, a]);
        assert!(!top.contains(&unrated));

        let roles: Vec<(Role, u64)> = dashboard
            .users_by_role
            .iter()
            .map(|r| (r.role, r.count))
            .collect();
        assert_eq!(
            roles,
            vec![(Role::Admin, 1), (Role::Owner, 1), (Role::User, 2)]
        );
        assert_eq!(dashboard.recent_ratings.len(), 3);
        assert_eq!(dashboard.recent_stores.len(), 3);
    }

    #[tokio::test]
    async fn test_admin_dashboard_lists_missing_roles_as_zero() {
        let repo = MemoryRepository::new();
        let admin = seed_user(&repo, "admin@example.com", Role::Admin).await;

        let dashboard = DashboardService::new(&repo)
            .admin(&admin.principal())
            .await
            .unwrap();
        let json = serde_json::to_value(&dashboard).unwrap();
        assert_eq!(json["usersByRole"].as_array().unwrap().len(), 3);
        assert_eq!(json["usersByRole"][1]["role"], "OWNER");
        assert_eq!(json["usersByRole"][1]["count"], 0);
        assert!(json["topRatedStores"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_owner_dashboard_breakdown() {
        let repo = MemoryRepository::new();
        let owner = seed_user(&repo, "owner@example.com", Role::Owner).await;
        let other = seed_user(&repo, "other@example.com", Role::Owner).await;
        let r1 = seed_user(&repo, "r1@example.com", Role::User).await;
        let r2 = seed_user(&repo, "r2@example.com", Role::User).await;
        let r3 = seed_user(&repo, "r3@example.com", Role::User).await;
        let mine = seed_store(&repo, "mine@example.com", owner.id).await;
        let theirs = seed_store(&repo, "theirs@example.com", other.id).await;

        rate(&repo, r1.id, mine, 5).await;
        rate(&repo, r2.id, mine, 5).await;
        rate(&repo, r3.id, mine, 4).await;
        rate(&repo, r1.id, theirs, 1).await;

        let dashboard = DashboardService::new(&repo)
            .owner(&owner.principal())
            .await
            .unwrap();

        assert_eq!(dashboard.stores.len(), 1);
        let store = dashboard.stores.first().unwrap();
        assert_eq!(store.store.id, mine);
        assert!((store.average_rating - 4.67).abs() < f64::EPSILON);
        assert_eq!(store.total_ratings, 3);
        assert_eq!(
            store.rating_distribution.values().copied().collect::<Vec<_>>(),
            vec![0, 0, 0, 1, 2]
        );
        assert_eq!(store.recent_ratings.len(), 3);

        assert_eq!(dashboard.summary.total_stores, 1);
        assert_eq!(dashboard.summary.total_ratings, 3);
        assert!((dashboard.summary.overall_average_rating - 4.67).abs() < f64::EPSILON);

        let json = serde_json::to_value(&dashboard).unwrap();
        assert_eq!(json["stores"][0]["ratingDistribution"]["5"], 2);
        assert!(json["stores"][0]["recentRatings"][0]["user"]["email"].is_string());
    }

    #[tokio::test]
    async fn test_owner_without_ratings_averages_zero() {
        let repo = MemoryRepository::new();
        let owner = seed_user(&repo, "owner@example.com", Role::Owner).await;
        seed_store(&repo, "quiet@example.com", owner.id).await;

        let dashboard = DashboardService::new(&repo)
            .owner(&owner.principal())
            .await
            .unwrap();
        assert!(dashboard.summary.overall_average_rating.abs() < f64::EPSILON);
        assert_eq!(dashboard.summary.total_ratings, 0);
    }

    #[tokio::test]
    async fn test_dashboards_are_role_gated() {
        let repo = MemoryRepository::new();
        let admin = seed_user(&repo, "admin@example.com", Role::Admin).await;
        let owner = seed_user(&repo, "owner@example.com", Role::Owner).await;
        let user = seed_user(&repo, "user@example.com", Role::User).await;
        let service = DashboardService::new(&repo);

        for principal in [owner.principal(), user.principal()] {
            let err = service.admin(&principal).await.unwrap_err();
            assert!(matches!(err, AppError::Forbidden(msg) if msg == "Access denied. Admin only."));
        }
        for principal in [admin.principal(), user.principal()] {
            let err = service.owner(&principal).await.unwrap_err();
            assert!(matches!(err, AppError::Forbidden(_)));
        }
    }
}
