//! Store route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

use storerate_core::StoreId;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::StoreRequest;
use crate::services::StoreService;
use crate::state::AppState;

use super::{AppJson, AppPath, AppQuery, ListParams};

/// `GET /api/stores`
///
/// # Errors
///
/// `400` for invalid listing parameters.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    AppQuery(params): AppQuery<ListParams>,
) -> Result<Json<Value>> {
    let query = params.store_query()?;
    let page = StoreService::new(state.repo()).list(&principal, &query).await?;
    Ok(Json(json!({
        "stores": page.items,
        "pagination": page.pagination,
    })))
}

/// `GET /api/stores/{id}`
///
/// # Errors
///
/// `404` for an unknown id.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    AppPath(id): AppPath<StoreId>,
) -> Result<Json<Value>> {
    let store = StoreService::new(state.repo()).get(&principal, id).await?;
    Ok(Json(json!({ "store": store })))
}

/// `POST /api/stores`
///
/// # Errors
///
/// `403` unless ADMIN, `400`, or `409` for a taken email or invalid owner.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    AppJson(request): AppJson<StoreRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let store = StoreService::new(state.repo())
        .create(&principal, request)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Store created successfully", "store": store })),
    ))
}

/// `PUT /api/stores/{id}`
///
/// # Errors
///
/// As [`create`], plus `404`.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    AppPath(id): AppPath<StoreId>,
    AppJson(request): AppJson<StoreRequest>,
) -> Result<Json<Value>> {
    let store = StoreService::new(state.repo())
        .update(&principal, id, request)
        .await?;
    Ok(Json(
        json!({ "message": "Store updated successfully", "store": store }),
    ))
}

/// `DELETE /api/stores/{id}`
///
/// # Errors
///
/// `403` unless ADMIN, `404`.
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    AppPath(id): AppPath<StoreId>,
) -> Result<Json<Value>> {
    StoreService::new(state.repo()).delete(&principal, id).await?;
    Ok(Json(json!({ "message": "Store deleted successfully" })))
}
