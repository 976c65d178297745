//! Rating route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

use storerate_core::{RatingId, StoreId, UserId};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::SubmitRatingRequest;
use crate::services::RatingService;
use crate::services::ratings::StoreRatings;
use crate::state::AppState;

use super::{AppJson, AppPath, AppQuery, ListParams};

/// `POST /api/ratings`
///
/// `201` for a first rating, `200` when an existing one was overwritten.
///
/// # Errors
///
/// `403` unless USER, `400` for a bad value, `404` for an unknown store.
pub async fn submit(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    AppJson(request): AppJson<SubmitRatingRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let submission = RatingService::new(state.repo())
        .submit(&principal, request)
        .await?;

    let (status, message) = if submission.was_update {
        (StatusCode::OK, "Rating updated successfully")
    } else {
        (StatusCode::CREATED, "Rating submitted successfully")
    };
    Ok((
        status,
        Json(json!({ "message": message, "rating": submission.rating })),
    ))
}

/// `GET /api/ratings/user/{user_id}`
///
/// # Errors
///
/// `403` unless ADMIN or the user themself.
pub async fn for_user(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    AppPath(user_id): AppPath<UserId>,
) -> Result<Json<Value>> {
    let ratings = RatingService::new(state.repo())
        .list_for_user(&principal, user_id)
        .await?;
    Ok(Json(json!({ "ratings": ratings })))
}

/// `GET /api/ratings/store/{store_id}`
///
/// # Errors
///
/// `404` for an unknown store, `403` for an OWNER of another store, `400`
/// for bad paging parameters.
pub async fn for_store(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    AppPath(store_id): AppPath<StoreId>,
    AppQuery(params): AppQuery<ListParams>,
) -> Result<Json<StoreRatings>> {
    let page = params.page_request()?;
    let ratings = RatingService::new(state.repo())
        .list_for_store(&principal, store_id, page)
        .await?;
    Ok(Json(ratings))
}

/// `DELETE /api/ratings/{id}`
///
/// # Errors
///
/// `404` for an unknown id, `403` unless ADMIN or the author.
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    AppPath(id): AppPath<RatingId>,
) -> Result<Json<Value>> {
    RatingService::new(state.repo()).delete(&principal, id).await?;
    Ok(Json(json!({ "message": "Rating deleted successfully" })))
}
