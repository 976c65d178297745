//! User domain types and user-facing request payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storerate_core::{
    Address, DisplayName, Email, FieldError, Password, Principal, Role, UserId, ValidationErrors,
};

use super::{parse_email, parse_role};

/// A user account (domain type).
///
/// The password hash is never part of this type; it is loaded separately
/// only where a credential check needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub address: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// The identity this user acts as for the rest of a request.
    #[must_use]
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            role: self.role,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }

    #[must_use]
    pub fn to_ref(&self) -> UserRef {
        UserRef {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// The identifying subset of a user embedded in other payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRef {
    pub id: UserId,
    pub name: String,
    pub email: Email,
}

impl From<&Principal> for UserRef {
    fn from(principal: &Principal) -> Self {
        Self {
            id: principal.id,
            name: principal.name.clone(),
            email: principal.email.clone(),
        }
    }
}

/// A validated user ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: DisplayName,
    pub email: Email,
    pub password_hash: String,
    pub address: Address,
    pub role: Role,
}

/// A validated replacement of a user's profile fields.
#[derive(Debug, Clone)]
pub struct UserChanges {
    pub name: DisplayName,
    pub email: Email,
    pub address: Address,
    pub role: Role,
}

/// Profile fields shared by registration and admin creation, after validation.
#[derive(Debug)]
pub struct ValidProfile {
    pub name: DisplayName,
    pub email: Email,
    pub password: Password,
    pub address: Address,
}

// =============================================================================
// Requests
// =============================================================================

/// `POST /api/auth/register`
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub address: String,
}

impl RegisterRequest {
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<ValidProfile, ValidationErrors> {
        validate_profile(&self.name, &self.email, &self.password, &self.address)
    }
}

/// `POST /api/auth/login`
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<Email, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let email = parse_email(&self.email);
        errors.record("email", &email);
        if self.password.is_empty() {
            errors.push(FieldError::new("password", "Password is required"));
        }
        errors.into_result()?;
        email.map_err(|e| ValidationErrors::single("email", e))
    }
}

/// `PUT /api/auth/password`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl UpdatePasswordRequest {
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<Password, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.current_password.is_empty() {
            errors.push(FieldError::new(
                "currentPassword",
                "Current password is required",
            ));
        }
        let new_password = Password::parse(&self.new_password);
        errors.record("newPassword", &new_password);
        errors.into_result()?;
        new_password.map_err(|e| ValidationErrors::single("newPassword", e.to_string()))
    }
}

/// `POST /api/users`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub address: String,
    pub role: String,
}

impl CreateUserRequest {
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<(ValidProfile, Role), ValidationErrors> {
        let profile = validate_profile(&self.name, &self.email, &self.password, &self.address);
        let role = parse_role(&self.role);

        match (profile, role) {
            (Ok(profile), Ok(role)) => Ok((profile, role)),
            (profile, role) => {
                let mut errors = profile.err().unwrap_or_default();
                errors.record("role", &role);
                Err(errors)
            }
        }
    }
}

/// `PUT /api/users/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUserRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub address: String,
    pub role: String,
}

impl UpdateUserRequest {
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<UserChanges, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let name = DisplayName::parse(&self.name);
        errors.record("name", &name);
        let email = parse_email(&self.email);
        errors.record("email", &email);
        let address = Address::parse(&self.address);
        errors.record("address", &address);
        let role = parse_role(&self.role);
        errors.record("role", &role);

        match (name, email, address, role) {
            (Ok(name), Ok(email), Ok(address), Ok(role)) => Ok(UserChanges {
                name,
                email,
                address,
                role,
            }),
            _ => Err(errors),
        }
    }
}

fn validate_profile(
    name: &str,
    email: &str,
    password: &str,
    address: &str,
) -> Result<ValidProfile, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let name = DisplayName::parse(name);
    errors.record("name", &name);
    let email = parse_email(email);
    errors.record("email", &email);
    let password = Password::parse(password);
    errors.record("password", &password);
    let address = Address::parse(address);
    errors.record("address", &address);

    match (name, email, password, address) {
        (Ok(name), Ok(email), Ok(password), Ok(address)) => Ok(ValidProfile {
            name,
            email,
            password,
            address,
        }),
        _ => Err(errors),
    }
}
