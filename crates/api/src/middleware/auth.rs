//! Bearer-token authentication extractor.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::Span;

use storerate_core::Principal;

use crate::error::{AppError, set_sentry_user};
use crate::services::AuthService;
use crate::services::auth::AuthError;
use crate::state::AppState;

/// Extractor that requires a valid `Authorization: Bearer <token>` header.
///
/// The token is verified and the user row reloaded, so the principal always
/// carries the user's current role. Rejects with `401` when the header is
/// missing, the token is bad or expired, or the user no longer exists.
///
/// ```rust,ignore
/// async fn handler(RequireAuth(principal): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", principal.name)
/// }
/// ```
pub struct RequireAuth(pub Principal);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthError::MissingToken)?;

        let principal = AuthService::new(state.repo(), state.tokens())
            .resolve(token)
            .await?;

        Span::current().record("user_id", principal.id.to_string());
        set_sentry_user(&principal.id, Some(principal.email.as_str()));
        Ok(Self(principal))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
