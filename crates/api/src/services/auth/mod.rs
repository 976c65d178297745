//! Authentication service.
//!
//! Password authentication with argon2id hashes and HS256 bearer tokens.
//! Tokens carry only the user id; [`AuthService::resolve`] turns a verified
//! token back into a [`Principal`] by reading the user's current row.

mod error;
mod token;

pub use error::AuthError;
pub use token::TokenCodec;

use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Serialize;
use tracing::instrument;

use storerate_core::{Principal, Role};

use crate::db::Repository;
use crate::error::Result;
use crate::models::user::ValidProfile;
use crate::models::{LoginRequest, NewUser, RegisterRequest, UpdatePasswordRequest, User};

/// A successful register or login.
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Authentication service.
pub struct AuthService<'a> {
    repo: &'a dyn Repository,
    tokens: &'a TokenCodec,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(repo: &'a dyn Repository, tokens: &'a TokenCodec) -> Self {
        Self { repo, tokens }
    }

    /// Self-register a USER account and sign it in.
    ///
    /// # Errors
    ///
    /// `Validation` for bad fields, `Conflict` when the email is taken.
    #[instrument(skip_all, fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse> {
        let profile = request.validate()?;
        let user = create_account(self.repo, profile, Role::User).await?;
        tracing::info!(user_id = %user.id, "User registered");

        let token = self.tokens.issue(user.id)?;
        Ok(AuthResponse { token, user })
    }

    /// Check an email and password and issue a token.
    ///
    /// # Errors
    ///
    /// `Unauthorized("Invalid credentials")` for an unknown email or a wrong
    /// password alike.
    #[instrument(skip_all, fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse> {
        let email = request.validate()?;

        let Some(user) = self.repo.find_user_by_email(&email).await? else {
            // Same argon2 cost as a wrong password.
            if let Some(hash) = dummy_hash() {
                let _ = verify_password(&request.password, hash);
            }
            tracing::warn!("Login failed: unknown email");
            return Err(AuthError::InvalidCredentials.into());
        };
        let hash = self
            .repo
            .find_password_hash(user.id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if let Err(e) = verify_password(&request.password, &hash) {
            tracing::warn!(user_id = %user.id, "Login failed: wrong password");
            return Err(e.into());
        }

        tracing::info!(user_id = %user.id, "User logged in");
        let token = self.tokens.issue(user.id)?;
        Ok(AuthResponse { token, user })
    }

    /// Change the caller's password after re-checking the current one.
    ///
    /// # Errors
    ///
    /// `Validation` when the new password breaks the policy, `Unauthorized`
    /// when the current password is wrong.
    #[instrument(skip_all, fields(user_id = %principal.id))]
    pub async fn update_password(
        &self,
        principal: &Principal,
        request: UpdatePasswordRequest,
    ) -> Result<()> {
        let new_password = request.validate()?;

        let hash = self
            .repo
            .find_password_hash(principal.id)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        verify_password(&request.current_password, &hash).map_err(|_| {
            tracing::warn!("Password change rejected: wrong current password");
            AuthError::WrongPassword
        })?;

        let new_hash = hash_password(new_password.expose())?;
        self.repo.update_password(principal.id, &new_hash).await?;
        tracing::info!("Password updated");
        Ok(())
    }

    /// The caller's own profile.
    ///
    /// # Errors
    ///
    /// `Unauthorized` if the account vanished after the token was checked.
    pub async fn me(&self, principal: &Principal) -> Result<User> {
        Ok(self
            .repo
            .find_user(principal.id)
            .await?
            .ok_or(AuthError::InvalidToken)?)
    }

    /// Turn a bearer token into the principal it names.
    ///
    /// # Errors
    ///
    /// `AuthError::InvalidToken` for a bad token or a deleted user.
    pub async fn resolve(&self, token: &str) -> std::result::Result<Principal, AuthError> {
        let user_id = self.tokens.verify(token)?;
        let user = self
            .repo
            .find_user(user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        Ok(user.principal())
    }
}

/// Hash and insert a validated profile with the given role.
///
/// # Errors
///
/// `Conflict` when the email is taken, `Internal` if hashing fails.
pub async fn create_account(
    repo: &dyn Repository,
    profile: ValidProfile,
    role: Role,
) -> Result<User> {
    let password_hash = hash_password(profile.password.expose())?;
    let user = repo
        .create_user(NewUser {
            name: profile.name,
            email: profile.email,
            password_hash,
            address: profile.address,
            role,
        })
        .await?;
    Ok(user)
}

/// A hash no real password matches, verified against on unknown-email logins.
fn dummy_hash() -> Option<&'static str> {
    static HASH: LazyLock<Option<String>> =
        LazyLock::new(|| hash_password("unmatched login placeholder").ok());
    HASH.as_deref()
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> std::result::Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` on mismatch or an unreadable hash.
pub fn verify_password(password: &str, hash: &str) -> std::result::Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use secrecy::SecretString;

    use super::*;
    use crate::db::{MemoryRepository, UserRepository};
    use crate::error::AppError;

    fn codec() -> TokenCodec {
        TokenCodec::new(
            &SecretString::from("k9$Tq2!vLz8#Rw4@Xp6^Nm1&Bc7*Hd3%".to_owned()),
            Duration::hours(1),
        )
    }

    fn registration() -> RegisterRequest {
        RegisterRequest {
            name: "Regular User Customer Person".to_owned(),
            email: "user@storerating.com".to_owned(),
            password: "Admin@1234".to_owned(),
            address: "789 Customer Lane".to_owned(),
        }
    }

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("Admin@1234").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("Admin@1234", &hash).is_ok());
        assert!(verify_password("Admin@12345", &hash).is_err());
    }

    #[tokio::test]
    async fn test_register_creates_user_and_resolves() {
        let repo = MemoryRepository::new();
        let tokens = codec();
        let auth = AuthService::new(&repo, &tokens);

        let session = auth.register(registration()).await.unwrap();
        assert_eq!(session.user.role, Role::User);

        let principal = auth.resolve(&session.token).await.unwrap();
        assert_eq!(principal.id, session.user.id);
        assert_eq!(principal.role, Role::User);
    }

    #[tokio::test]
    async fn test_register_duplicate_email_conflicts() {
        let repo = MemoryRepository::new();
        let tokens = codec();
        let auth = AuthService::new(&repo, &tokens);
        auth.register(registration()).await.unwrap();

        let err = auth.register(registration()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(msg) if msg == "User with this email already exists"));
    }

    #[tokio::test]
    async fn test_login_does_not_reveal_which_part_failed() {
        let repo = MemoryRepository::new();
        let tokens = codec();
        let auth = AuthService::new(&repo, &tokens);
        auth.register(registration()).await.unwrap();

        let wrong_password = auth
            .login(LoginRequest {
                email: "user@storerating.com".to_owned(),
                password: "Nope@1234".to_owned(),
            })
            .await
            .unwrap_err();
        let wrong_email = auth
            .login(LoginRequest {
                email: "nobody@storerating.com".to_owned(),
                password: "Admin@1234".to_owned(),
            })
            .await
            .unwrap_err();
        assert_eq!(wrong_password.to_string(), "Invalid credentials");
        assert_eq!(wrong_email.to_string(), "Invalid credentials");
    }

    #[test]
    fn test_unknown_email_pays_same_hash_cost() {
        let dummy = dummy_hash().unwrap();
        assert!(verify_password("Admin@1234", dummy).is_err());

        let real = hash_password("Admin@1234").unwrap();
        let (dummy, real) = (
            PasswordHash::new(dummy).unwrap(),
            PasswordHash::new(&real).unwrap(),
        );
        assert_eq!(dummy.algorithm, real.algorithm);
        assert_eq!(dummy.params, real.params);
    }

    #[tokio::test]
    async fn test_update_password_requires_current() {
        let repo = MemoryRepository::new();
        let tokens = codec();
        let auth = AuthService::new(&repo, &tokens);
        let session = auth.register(registration()).await.unwrap();
        let principal = session.user.principal();

        let err = auth
            .update_password(
                &principal,
                UpdatePasswordRequest {
                    current_password: "Wrong@1234".to_owned(),
                    new_password: "Better#5678".to_owned(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        auth.update_password(
            &principal,
            UpdatePasswordRequest {
                current_password: "Admin@1234".to_owned(),
                new_password: "Better#5678".to_owned(),
            },
        )
        .await
        .unwrap();

        auth.login(LoginRequest {
            email: "user@storerating.com".to_owned(),
            password: "Better#5678".to_owned(),
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_resolve_rejects_deleted_user() {
        let repo = MemoryRepository::new();
        let tokens = codec();
        let auth = AuthService::new(&repo, &tokens);
        let session = auth.register(registration()).await.unwrap();
        repo.delete_user(session.user.id).await.unwrap();

        assert!(matches!(
            auth.resolve(&session.token).await,
            Err(AuthError::InvalidToken)
        ));
    }
}
