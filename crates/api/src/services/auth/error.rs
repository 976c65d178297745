//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong email or password. Never says which.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The current password given for a password change is wrong.
    #[error("Current password is incorrect")]
    WrongPassword,

    /// No bearer token on the request.
    #[error("Access denied. No token provided.")]
    MissingToken,

    /// Malformed, forged or expired token, or its user no longer exists.
    #[error("Invalid token.")]
    InvalidToken,

    /// User already exists.
    #[error("User with this email already exists")]
    UserAlreadyExists,

    /// Signing a token failed.
    #[error("token signing failed: {0}")]
    Token(#[source] jsonwebtoken::errors::Error),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
