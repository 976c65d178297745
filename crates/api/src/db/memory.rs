//! In-process repository.
//!
//! Mirrors the `PostgreSQL` adapter's constraints (unique emails, owner role
//! checks, `RESTRICT` on store owners, cascading ratings) over plain maps
//! guarded by a single async mutex. Every operation holds the lock for its
//! whole duration, which makes each one atomic.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use storerate_core::query::{self, Queryable, StoreField, UserField};
use storerate_core::{
    Email, ListQuery, Page, PageRequest, RatingId, RatingValue, Role, StoreId, UserId,
};

use super::{
    RatingRepository, Repository, RepositoryError, StoreRepository, UserRepository, conflict,
};
use crate::models::{
    NewStore, NewUser, Rating, RatingSample, RatingView, SampleScope, Store, StoreChanges,
    StoreRef, User, UserChanges,
};

// =============================================================================
// Tables
// =============================================================================

#[derive(Debug, Clone)]
struct UserRecord {
    user: User,
    password_hash: String,
}

#[derive(Debug, Clone)]
struct StoreRecord {
    id: StoreId,
    name: String,
    email: Email,
    address: String,
    owner_id: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, UserRecord>,
    stores: BTreeMap<StoreId, StoreRecord>,
    ratings: BTreeMap<RatingId, Rating>,
    last_user: i32,
    last_store: i32,
    last_rating: i32,
}

impl Tables {
    fn next_user_id(&mut self) -> UserId {
        self.last_user += 1;
        UserId::new(self.last_user)
    }

    fn next_store_id(&mut self) -> StoreId {
        self.last_store += 1;
        StoreId::new(self.last_store)
    }

    fn next_rating_id(&mut self) -> RatingId {
        self.last_rating += 1;
        RatingId::new(self.last_rating)
    }

    fn user_email_taken(&self, email: &Email, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|r| r.user.email == *email && Some(r.user.id) != except)
    }

    fn store_email_taken(&self, email: &Email, except: Option<StoreId>) -> bool {
        self.stores
            .values()
            .any(|s| s.email == *email && Some(s.id) != except)
    }

    fn owns_stores(&self, user_id: UserId) -> bool {
        self.stores.values().any(|s| s.owner_id == user_id)
    }

    fn require_owner(&self, owner_id: UserId) -> Result<(), RepositoryError> {
        match self.users.get(&owner_id) {
            Some(r) if r.user.role == Role::Owner => Ok(()),
            _ => Err(RepositoryError::InvalidReference(
                conflict::INVALID_OWNER.to_owned(),
            )),
        }
    }

    fn store(&self, record: &StoreRecord) -> Result<Store, RepositoryError> {
        let owner = self.users.get(&record.owner_id).ok_or_else(|| {
            RepositoryError::DataCorruption(format!(
                "store {} references missing owner {}",
                record.id, record.owner_id
            ))
        })?;
        Ok(Store {
            id: record.id,
            name: record.name.clone(),
            email: record.email.clone(),
            address: record.address.clone(),
            owner: owner.user.to_ref(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    fn stores<'a>(
        &self,
        records: impl IntoIterator<Item = &'a StoreRecord>,
    ) -> Result<Vec<Store>, RepositoryError> {
        records.into_iter().map(|r| self.store(r)).collect()
    }

    fn view(&self, rating: &Rating) -> Result<RatingView, RepositoryError> {
        let missing = || {
            RepositoryError::DataCorruption(format!("rating {} has a dangling reference", rating.id))
        };
        let user = self.users.get(&rating.user_id).ok_or_else(missing)?;
        let store = self.stores.get(&rating.store_id).ok_or_else(missing)?;
        Ok(RatingView {
            rating: *rating,
            user: user.user.to_ref(),
            store: StoreRef {
                id: store.id,
                name: store.name.clone(),
                address: store.address.clone(),
            },
        })
    }

    /// Ratings matching `keep`, newest first.
    fn views(&self, keep: impl Fn(&Rating) -> bool) -> Result<Vec<RatingView>, RepositoryError> {
        let mut ratings: Vec<&Rating> = self.ratings.values().filter(|r| keep(r)).collect();
        ratings.sort_by(|a, b| newest_first(a.created_at, a.id, b.created_at, b.id));
        ratings.into_iter().map(|r| self.view(r)).collect()
    }
}

fn newest_first<K: Ord>(
    a_at: DateTime<Utc>,
    a_id: K,
    b_at: DateTime<Utc>,
    b_id: K,
) -> Ordering {
    b_at.cmp(&a_at).then_with(|| b_id.cmp(&a_id))
}

fn take(limit: u32) -> usize {
    usize::try_from(limit).unwrap_or(usize::MAX)
}

// =============================================================================
// Listing
// =============================================================================

impl Queryable for User {
    type Field = UserField;
    type Key = UserId;

    fn key(&self) -> UserId {
        self.id
    }

    fn text(&self, field: UserField) -> Cow<'_, str> {
        match field {
            UserField::Name => Cow::Borrowed(&self.name),
            UserField::Email => Cow::Borrowed(self.email.as_str()),
            UserField::Address => Cow::Borrowed(&self.address),
            UserField::Role => Cow::Borrowed(self.role.as_str()),
            UserField::CreatedAt => Cow::Owned(self.created_at.to_rfc3339()),
        }
    }

    fn compare(&self, other: &Self, field: UserField) -> Ordering {
        match field {
            UserField::CreatedAt => self.created_at.cmp(&other.created_at),
            UserField::Role => self.role.cmp(&other.role),
            UserField::Name | UserField::Email | UserField::Address => {
                query::compare_text(&self.text(field), &other.text(field))
            }
        }
    }
}

impl Queryable for Store {
    type Field = StoreField;
    type Key = StoreId;

    fn key(&self) -> StoreId {
        self.id
    }

    fn text(&self, field: StoreField) -> Cow<'_, str> {
        match field {
            StoreField::Name => Cow::Borrowed(&self.name),
            StoreField::Email => Cow::Borrowed(self.email.as_str()),
            StoreField::Address => Cow::Borrowed(&self.address),
            StoreField::CreatedAt => Cow::Owned(self.created_at.to_rfc3339()),
        }
    }

    fn compare(&self, other: &Self, field: StoreField) -> Ordering {
        match field {
            StoreField::CreatedAt => self.created_at.cmp(&other.created_at),
            StoreField::Name | StoreField::Email | StoreField::Address => {
                query::compare_text(&self.text(field), &other.text(field))
            }
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// In-memory implementation of [`Repository`].
#[derive(Debug, Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
}

impl MemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryRepository {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.get(&id).map(|r| r.user.clone()))
    }

    async fn find_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|r| r.user.email == *email)
            .map(|r| r.user.clone()))
    }

    async fn find_password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.get(&id).map(|r| r.password_hash.clone()))
    }

    async fn list_users(
        &self,
        list: &ListQuery<UserField>,
    ) -> Result<Page<User>, RepositoryError> {
        let tables = self.tables.lock().await;
        let users = tables.users.values().map(|r| r.user.clone());
        Ok(query::query(users, list))
    }

    async fn recent_users(&self, limit: u32) -> Result<Vec<User>, RepositoryError> {
        let tables = self.tables.lock().await;
        let mut users: Vec<User> = tables.users.values().map(|r| r.user.clone()).collect();
        users.sort_by(|a, b| newest_first(a.created_at, a.id, b.created_at, b.id));
        users.truncate(take(limit));
        Ok(users)
    }

    async fn count_users(&self) -> Result<u64, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.len() as u64)
    }

    async fn count_users_by_role(&self) -> Result<Vec<(Role, u64)>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(Role::ALL
            .iter()
            .map(|role| {
                let n = tables.users.values().filter(|r| r.user.role == *role).count();
                (*role, n as u64)
            })
            .filter(|(_, n)| *n > 0)
            .collect())
    }

    async fn create_user(&self, new: NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if tables.user_email_taken(&new.email, None) {
            return Err(RepositoryError::Conflict(
                conflict::USER_EMAIL_EXISTS.to_owned(),
            ));
        }

        let now = Utc::now();
        let user = User {
            id: tables.next_user_id(),
            name: new.name.as_str().to_owned(),
            email: new.email,
            address: new.address.as_str().to_owned(),
            role: new.role,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(
            user.id,
            UserRecord {
                user: user.clone(),
                password_hash: new.password_hash,
            },
        );
        Ok(user)
    }

    async fn update_user(
        &self,
        id: UserId,
        changes: UserChanges,
    ) -> Result<User, RepositoryError> {
        let mut tables = self.tables.lock().await;
        let current = tables
            .users
            .get(&id)
            .map(|r| r.user.role)
            .ok_or(RepositoryError::NotFound)?;

        if current == Role::Owner && changes.role != Role::Owner && tables.owns_stores(id) {
            return Err(RepositoryError::Conflict(
                conflict::OWNER_ROLE_LOCKED.to_owned(),
            ));
        }
        if tables.user_email_taken(&changes.email, Some(id)) {
            return Err(RepositoryError::Conflict(
                conflict::USER_EMAIL_TAKEN.to_owned(),
            ));
        }

        let record = tables.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        record.user.name = changes.name.as_str().to_owned();
        record.user.email = changes.email;
        record.user.address = changes.address.as_str().to_owned();
        record.user.role = changes.role;
        record.user.updated_at = Utc::now();
        Ok(record.user.clone())
    }

    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock().await;
        let record = tables.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        password_hash.clone_into(&mut record.password_hash);
        record.user.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock().await;
        if !tables.users.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        if tables.owns_stores(id) {
            return Err(RepositoryError::Conflict(
                conflict::OWNER_DELETE_LOCKED.to_owned(),
            ));
        }
        tables.users.remove(&id);
        tables.ratings.retain(|_, r| r.user_id != id);
        Ok(())
    }
}

#[async_trait]
impl StoreRepository for MemoryRepository {
    async fn find_store(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let tables = self.tables.lock().await;
        tables.stores.get(&id).map(|r| tables.store(r)).transpose()
    }

    async fn list_stores(
        &self,
        list: &ListQuery<StoreField>,
    ) -> Result<Page<Store>, RepositoryError> {
        let tables = self.tables.lock().await;
        let stores = tables.stores(tables.stores.values())?;
        Ok(query::query(stores, list))
    }

    async fn recent_stores(&self, limit: u32) -> Result<Vec<Store>, RepositoryError> {
        let tables = self.tables.lock().await;
        let mut records: Vec<&StoreRecord> = tables.stores.values().collect();
        records.sort_by(|a, b| newest_first(a.created_at, a.id, b.created_at, b.id));
        records.truncate(take(limit));
        tables.stores(records)
    }

    async fn stores_by_owner(&self, owner_id: UserId) -> Result<Vec<Store>, RepositoryError> {
        let tables = self.tables.lock().await;
        let mut records: Vec<&StoreRecord> = tables
            .stores
            .values()
            .filter(|s| s.owner_id == owner_id)
            .collect();
        records.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        tables.stores(records)
    }

    async fn stores_by_ids(&self, ids: &[StoreId]) -> Result<Vec<Store>, RepositoryError> {
        let tables = self.tables.lock().await;
        let records = tables.stores.values().filter(|s| ids.contains(&s.id));
        tables.stores(records)
    }

    async fn count_stores(&self) -> Result<u64, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.stores.len() as u64)
    }

    async fn create_store(&self, new: NewStore) -> Result<Store, RepositoryError> {
        let mut tables = self.tables.lock().await;
        tables.require_owner(new.owner_id)?;
        if tables.store_email_taken(&new.email, None) {
            return Err(RepositoryError::Conflict(
                conflict::STORE_EMAIL_EXISTS.to_owned(),
            ));
        }

        let now = Utc::now();
        let record = StoreRecord {
            id: tables.next_store_id(),
            name: new.name.as_str().to_owned(),
            email: new.email,
            address: new.address.as_str().to_owned(),
            owner_id: new.owner_id,
            created_at: now,
            updated_at: now,
        };
        let store = tables.store(&record)?;
        tables.stores.insert(record.id, record);
        Ok(store)
    }

    async fn update_store(
        &self,
        id: StoreId,
        changes: StoreChanges,
    ) -> Result<Store, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if !tables.stores.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        if let Some(owner_id) = changes.owner_id {
            tables.require_owner(owner_id)?;
        }
        if tables.store_email_taken(&changes.email, Some(id)) {
            return Err(RepositoryError::Conflict(
                conflict::STORE_EMAIL_EXISTS.to_owned(),
            ));
        }

        let record = tables.stores.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        record.name = changes.name.as_str().to_owned();
        record.email = changes.email;
        record.address = changes.address.as_str().to_owned();
        if let Some(owner_id) = changes.owner_id {
            record.owner_id = owner_id;
        }
        record.updated_at = Utc::now();

        let record = record.clone();
        tables.store(&record)
    }

    async fn delete_store(&self, id: StoreId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock().await;
        if tables.stores.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        tables.ratings.retain(|_, r| r.store_id != id);
        Ok(())
    }
}

#[async_trait]
impl RatingRepository for MemoryRepository {
    async fn upsert_rating(
        &self,
        user_id: UserId,
        store_id: StoreId,
        value: RatingValue,
    ) -> Result<(Rating, bool), RepositoryError> {
        let mut tables = self.tables.lock().await;
        if !tables.users.contains_key(&user_id) {
            return Err(RepositoryError::InvalidReference("ratings_user_id_fkey".to_owned()));
        }
        if !tables.stores.contains_key(&store_id) {
            return Err(RepositoryError::InvalidReference("ratings_store_id_fkey".to_owned()));
        }

        let now = Utc::now();
        if let Some(existing) = tables
            .ratings
            .values_mut()
            .find(|r| r.user_id == user_id && r.store_id == store_id)
        {
            existing.value = value;
            existing.updated_at = now;
            return Ok((*existing, true));
        }

        let rating = Rating {
            id: tables.next_rating_id(),
            value,
            user_id,
            store_id,
            created_at: now,
            updated_at: now,
        };
        tables.ratings.insert(rating.id, rating);
        Ok((rating, false))
    }

    async fn find_rating(&self, id: RatingId) -> Result<Option<Rating>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.ratings.get(&id).copied())
    }

    async fn delete_rating(&self, id: RatingId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock().await;
        tables
            .ratings
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn ratings_by_user(&self, user_id: UserId) -> Result<Vec<RatingView>, RepositoryError> {
        let tables = self.tables.lock().await;
        tables.views(|r| r.user_id == user_id)
    }

    async fn ratings_for_store(
        &self,
        store_id: StoreId,
        author: Option<UserId>,
        page: PageRequest,
    ) -> Result<Page<RatingView>, RepositoryError> {
        let tables = self.tables.lock().await;
        let views = tables
            .views(|r| r.store_id == store_id && author.is_none_or(|a| r.user_id == a))?;
        Ok(Page::slice(views, page))
    }

    async fn recent_ratings(&self, limit: u32) -> Result<Vec<RatingView>, RepositoryError> {
        let tables = self.tables.lock().await;
        let mut views = tables.views(|_| true)?;
        views.truncate(take(limit));
        Ok(views)
    }

    async fn count_ratings(&self) -> Result<u64, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.ratings.len() as u64)
    }

    async fn rating_samples(
        &self,
        scope: &SampleScope,
    ) -> Result<Vec<RatingSample>, RepositoryError> {
        let tables = self.tables.lock().await;
        let mut samples = Vec::new();
        for rating in tables.ratings.values() {
            let Some(store) = tables.stores.get(&rating.store_id) else {
                continue;
            };
            let sample = RatingSample {
                store_id: rating.store_id,
                owner_id: store.owner_id,
                user_id: rating.user_id,
                value: rating.value,
            };
            if scope.contains(&sample) {
                samples.push(sample);
            }
        }
        Ok(samples)
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use storerate_core::query::Matcher;
    use storerate_core::{Address, DisplayName};

    use super::*;

    fn new_user(email: &str, role: Role) -> NewUser {
        NewUser {
            name: DisplayName::parse("Some Reasonably Long Name").unwrap(),
            email: Email::parse(email).unwrap(),
            password_hash: "hash".to_owned(),
            address: Address::parse("1 Main Street").unwrap(),
            role,
        }
    }

    fn new_store(email: &str, owner_id: UserId) -> NewStore {
        NewStore {
            name: DisplayName::parse("A Store With A Long Enough Name").unwrap(),
            email: Email::parse(email).unwrap(),
            address: Address::parse("2 Market Street").unwrap(),
            owner_id,
        }
    }

    fn changes_from(user: &User, role: Role) -> UserChanges {
        UserChanges {
            name: DisplayName::parse(&user.name).unwrap(),
            email: user.email.clone(),
            address: Address::parse(&user.address).unwrap(),
            role,
        }
    }

    #[tokio::test]
    async fn test_duplicate_user_email_conflicts() {
        let repo = MemoryRepository::new();
        repo.create_user(new_user("a@example.com", Role::User)).await.unwrap();
        let err = repo
            .create_user(new_user("a@example.com", Role::Admin))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(msg) if msg == conflict::USER_EMAIL_EXISTS));
    }

    #[tokio::test]
    async fn test_store_requires_owner_role() {
        let repo = MemoryRepository::new();
        let user = repo.create_user(new_user("u@example.com", Role::User)).await.unwrap();
        let err = repo
            .create_store(new_store("s@example.com", user.id))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidReference(_)));

        let err = repo
            .create_store(new_store("s@example.com", UserId::new(99)))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidReference(_)));
    }

    #[tokio::test]
    async fn test_owner_with_stores_is_locked() {
        let repo = MemoryRepository::new();
        let owner = repo.create_user(new_user("o@example.com", Role::Owner)).await.unwrap();
        let store = repo.create_store(new_store("s@example.com", owner.id)).await.unwrap();
        assert_eq!(store.owner.id, owner.id);

        let err = repo
            .update_user(owner.id, changes_from(&owner, Role::User))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(msg) if msg == conflict::OWNER_ROLE_LOCKED));

        let err = repo.delete_user(owner.id).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(msg) if msg == conflict::OWNER_DELETE_LOCKED));

        repo.delete_store(store.id).await.unwrap();
        repo.update_user(owner.id, changes_from(&owner, Role::User))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_upsert_reports_update() {
        let repo = MemoryRepository::new();
        let owner = repo.create_user(new_user("o@example.com", Role::Owner)).await.unwrap();
        let user = repo.create_user(new_user("u@example.com", Role::User)).await.unwrap();
        let store = repo.create_store(new_store("s@example.com", owner.id)).await.unwrap();

        let (first, was_update) = repo
            .upsert_rating(user.id, store.id, RatingValue::new(3).unwrap())
            .await
            .unwrap();
        assert!(!was_update);

        let (second, was_update) = repo
            .upsert_rating(user.id, store.id, RatingValue::new(5).unwrap())
            .await
            .unwrap();
        assert!(was_update);
        assert_eq!(first.id, second.id);
        assert_eq!(second.value.get(), 5);
        assert_eq!(repo.count_ratings().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_unknown_store_is_invalid_reference() {
        let repo = MemoryRepository::new();
        let user = repo.create_user(new_user("u@example.com", Role::User)).await.unwrap();
        let err = repo
            .upsert_rating(user.id, StoreId::new(42), RatingValue::new(3).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidReference(_)));
    }

    #[tokio::test]
    async fn test_concurrent_upserts_leave_one_row() {
        let repo = Arc::new(MemoryRepository::new());
        let owner = repo.create_user(new_user("o@example.com", Role::Owner)).await.unwrap();
        let user = repo.create_user(new_user("u@example.com", Role::User)).await.unwrap();
        let store = repo.create_store(new_store("s@example.com", owner.id)).await.unwrap();

        let (user_id, store_id) = (user.id, store.id);
        let mut handles = Vec::new();
        for v in 1..=5 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                repo.upsert_rating(user_id, store_id, RatingValue::new(v).unwrap())
                    .await
                    .unwrap()
                    .1
            }));
        }
        let mut inserts = 0;
        for handle in handles {
            if !handle.await.unwrap() {
                inserts += 1;
            }
        }
        assert_eq!(inserts, 1);
        assert_eq!(repo.count_ratings().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_deleting_store_cascades_ratings() {
        let repo = MemoryRepository::new();
        let owner = repo.create_user(new_user("o@example.com", Role::Owner)).await.unwrap();
        let user = repo.create_user(new_user("u@example.com", Role::User)).await.unwrap();
        let store = repo.create_store(new_store("s@example.com", owner.id)).await.unwrap();
        repo.upsert_rating(user.id, store.id, RatingValue::new(4).unwrap())
            .await
            .unwrap();

        repo.delete_store(store.id).await.unwrap();
        assert_eq!(repo.count_ratings().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_users_filters_and_pages() {
        let repo = MemoryRepository::new();
        for i in 0..5 {
            repo.create_user(new_user(&format!("owner{i}@example.com"), Role::Owner))
                .await
                .unwrap();
        }
        repo.create_user(new_user("plain@example.com", Role::User)).await.unwrap();

        let list = ListQuery::default()
            .filter(UserField::Role, Matcher::Exact("OWNER".to_owned()))
            .page(PageRequest::new(Some(1), Some(2)).unwrap());
        let page = repo.list_users(&list).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.pagination.total, 5);
        assert_eq!(page.pagination.total_pages, 3);
    }

    #[tokio::test]
    async fn test_samples_by_owner() {
        let repo = MemoryRepository::new();
        let owner = repo.create_user(new_user("o@example.com", Role::Owner)).await.unwrap();
        let user = repo.create_user(new_user("u@example.com", Role::User)).await.unwrap();
        let store = repo.create_store(new_store("s@example.com", owner.id)).await.unwrap();
        repo.upsert_rating(user.id, store.id, RatingValue::new(2).unwrap())
            .await
            .unwrap();

        let samples = repo
            .rating_samples(&SampleScope::Owners(vec![owner.id]))
            .await
            .unwrap();
        assert_eq!(samples.len(), 1);
        assert!(repo
            .rating_samples(&SampleScope::Owners(vec![user.id]))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_name_sort_ignores_case() {
        let repo = MemoryRepository::new();
        for (name, email) in [
            ("alice Lowercase Person Name", "alice@example.com"),
            ("Bob Uppercase Person Name", "bob@example.com"),
        ] {
            let mut user = new_user(email, Role::User);
            user.name = DisplayName::parse(name).unwrap();
            repo.create_user(user).await.unwrap();
        }

        let names: Vec<String> = repo
            .list_users(&ListQuery::default())
            .await
            .unwrap()
            .items
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(
            names,
            vec!["alice Lowercase Person Name", "Bob Uppercase Person Name"]
        );
    }
}
