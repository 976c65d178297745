//! Administrator bootstrap command.
//!
//! ADMIN accounts cannot be self-registered, so the first one is created
//! here. Input goes through the same validation as `POST /api/users`.
//!
//! # Usage
//!
//! ```bash
//! sr-cli admin create -e admin@example.com -n "Site Administrator Account" -p 'S3cure!pass'
//! ```

use storerate_api::db::PgRepository;
use storerate_api::models::CreateUserRequest;
use storerate_api::services::auth::create_account;
use storerate_core::UserId;

use super::{CommandError, connect};

/// Create a new ADMIN user.
///
/// # Errors
///
/// Returns `Rejected` with every failing field when validation fails, or
/// when the email is already registered.
pub async fn create_user(
    email: &str,
    name: &str,
    address: &str,
    password: &str,
) -> Result<UserId, CommandError> {
    let request = CreateUserRequest {
        name: name.to_owned(),
        email: email.to_owned(),
        password: password.to_owned(),
        address: address.to_owned(),
        role: "ADMIN".to_owned(),
    };
    let (profile, role) = request.validate().map_err(|errors| {
        let fields: Vec<String> = errors
            .errors()
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        CommandError::Rejected(fields.join("; "))
    })?;

    let repo = PgRepository::new(connect().await?);

    tracing::info!("Creating admin user: {}", email);
    let user = create_account(&repo, profile, role)
        .await
        .map_err(|e| CommandError::Rejected(e.to_string()))?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );
    Ok(user.id)
}
