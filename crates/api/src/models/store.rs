//! Store domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storerate_core::{Address, DisplayName, Email, FieldError, StoreId, UserId, ValidationErrors};

use super::UserRef;
use super::parse_email;

/// A store together with its owner's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub email: Email,
    pub address: String,
    pub owner: UserRef,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    #[must_use]
    pub const fn owner_id(&self) -> UserId {
        self.owner.id
    }
}

/// A validated store ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewStore {
    pub name: DisplayName,
    pub email: Email,
    pub address: Address,
    pub owner_id: UserId,
}

/// A validated store update. `owner_id` of `None` keeps the current owner.
#[derive(Debug, Clone)]
pub struct StoreChanges {
    pub name: DisplayName,
    pub email: Email,
    pub address: Address,
    pub owner_id: Option<UserId>,
}

/// `POST /api/stores` and `PUT /api/stores/{id}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub address: String,
    pub owner_id: Option<i32>,
}

impl StoreRequest {
    /// Validate for creation, where an owner is mandatory.
    ///
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate_new(&self) -> Result<NewStore, ValidationErrors> {
        let (changes, mut errors) = self.check();
        if self.owner_id.is_none() {
            errors.push(FieldError::new("ownerId", "Owner ID is required"));
        }
        match (changes, self.owner_id) {
            (Some(c), Some(owner_id)) if errors.is_empty() => Ok(NewStore {
                name: c.name,
                email: c.email,
                address: c.address,
                owner_id: UserId::new(owner_id),
            }),
            _ => Err(errors),
        }
    }

    /// Validate for update.
    ///
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate_changes(&self) -> Result<StoreChanges, ValidationErrors> {
        match self.check() {
            (Some(changes), errors) if errors.is_empty() => Ok(changes),
            (_, errors) => Err(errors),
        }
    }

    fn check(&self) -> (Option<StoreChanges>, ValidationErrors) {
        let mut errors = ValidationErrors::default();

        let name = DisplayName::parse(&self.name)
            .map_err(|_| "Store name must be between 20 and 60 characters");
        errors.record("name", &name);
        let email = parse_email(&self.email);
        errors.record("email", &email);
        let address = Address::parse(&self.address);
        errors.record("address", &address);

        let changes = match (name, email, address) {
            (Ok(name), Ok(email), Ok(address)) => Some(StoreChanges {
                name,
                email,
                address,
                owner_id: self.owner_id.map(UserId::new),
            }),
            _ => None,
        };
        (changes, errors)
    }
}
