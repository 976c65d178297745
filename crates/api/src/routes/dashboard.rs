//! Dashboard route handlers.

use axum::{Json, extract::State};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::DashboardService;
use crate::services::dashboard::{AdminDashboard, OwnerDashboard};
use crate::state::AppState;

/// `GET /api/dashboard/admin`
///
/// # Errors
///
/// `403` unless ADMIN.
pub async fn admin(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
) -> Result<Json<AdminDashboard>> {
    Ok(Json(
        DashboardService::new(state.repo()).admin(&principal).await?,
    ))
}

/// `GET /api/dashboard/owner`
///
/// # Errors
///
/// `403` unless OWNER.
pub async fn owner(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
) -> Result<Json<OwnerDashboard>> {
    Ok(Json(
        DashboardService::new(state.repo()).owner(&principal).await?,
    ))
}
