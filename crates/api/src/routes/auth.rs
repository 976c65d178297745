//! Authentication route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{LoginRequest, RegisterRequest, UpdatePasswordRequest, User};
use crate::services::AuthService;
use crate::services::auth::AuthResponse;
use crate::state::AppState;

use super::{AppJson, Message};

/// `POST /api/auth/register`
///
/// # Errors
///
/// `400` for invalid fields, `409` when the email is taken.
pub async fn register(
    State(state): State<AppState>,
    AppJson(request): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<Message<AuthResponse>>)> {
    let session = AuthService::new(state.repo(), state.tokens())
        .register(request)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(Message {
            message: "User registered successfully",
            body: session,
        }),
    ))
}

/// `POST /api/auth/login`
///
/// # Errors
///
/// `401` for an unknown email or wrong password.
pub async fn login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> Result<Json<Message<AuthResponse>>> {
    let session = AuthService::new(state.repo(), state.tokens())
        .login(request)
        .await?;
    Ok(Json(Message {
        message: "Login successful",
        body: session,
    }))
}

/// `PUT /api/auth/password`
///
/// # Errors
///
/// `400` when the new password breaks the policy, `401` when the current one
/// is wrong.
pub async fn update_password(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    AppJson(request): AppJson<UpdatePasswordRequest>,
) -> Result<Json<Value>> {
    AuthService::new(state.repo(), state.tokens())
        .update_password(&principal, request)
        .await?;
    Ok(Json(json!({ "message": "Password updated successfully" })))
}

/// `GET /api/auth/me`
///
/// # Errors
///
/// `401` without a valid token.
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
) -> Result<Json<Value>> {
    let user: User = AuthService::new(state.repo(), state.tokens())
        .me(&principal)
        .await?;
    Ok(Json(json!({ "user": user })))
}
