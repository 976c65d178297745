//! User administration route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

use storerate_core::UserId;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{CreateUserRequest, UpdateUserRequest};
use crate::services::UserService;
use crate::state::AppState;

use super::{AppJson, AppPath, AppQuery, ListParams};

/// `GET /api/users`
///
/// # Errors
///
/// `400` for invalid listing parameters.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    AppQuery(params): AppQuery<ListParams>,
) -> Result<Json<Value>> {
    let query = params.user_query()?;
    let page = UserService::new(state.repo()).list(&principal, &query).await?;
    Ok(Json(json!({
        "users": page.items,
        "pagination": page.pagination,
    })))
}

/// `GET /api/users/{id}`
///
/// # Errors
///
/// `404` for an unknown id.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    AppPath(id): AppPath<UserId>,
) -> Result<Json<Value>> {
    let user = UserService::new(state.repo()).get(&principal, id).await?;
    Ok(Json(json!({ "user": user })))
}

/// `POST /api/users`
///
/// # Errors
///
/// `403` unless ADMIN, `400` for invalid fields, `409` for a taken email.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    AppJson(request): AppJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let user = UserService::new(state.repo())
        .create(&principal, request)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User created successfully", "user": user })),
    ))
}

/// `PUT /api/users/{id}`
///
/// # Errors
///
/// `403` unless ADMIN, `404`, `400`, or `409`.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    AppPath(id): AppPath<UserId>,
    AppJson(request): AppJson<UpdateUserRequest>,
) -> Result<Json<Value>> {
    let user = UserService::new(state.repo())
        .update(&principal, id, request)
        .await?;
    Ok(Json(
        json!({ "message": "User updated successfully", "user": user }),
    ))
}

/// `DELETE /api/users/{id}`
///
/// # Errors
///
/// `403` unless ADMIN, `404`, or `409` while the user owns stores.
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    AppPath(id): AppPath<UserId>,
) -> Result<Json<Value>> {
    UserService::new(state.repo()).delete(&principal, id).await?;
    Ok(Json(json!({ "message": "User deleted successfully" })))
}
