//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! # Auth
//! POST   /api/auth/register           - Self-register a USER account
//! POST   /api/auth/login              - Exchange credentials for a token (rate limited)
//! PUT    /api/auth/password           - Change own password
//! GET    /api/auth/me                 - Own profile
//!
//! # Users
//! GET    /api/users                   - Filtered, sorted, paged listing
//! POST   /api/users                   - Create any role (admin)
//! GET    /api/users/{id}              - Single user
//! PUT    /api/users/{id}              - Update (admin)
//! DELETE /api/users/{id}              - Delete (admin)
//!
//! # Stores
//! GET    /api/stores                  - Listing with live averages
//! POST   /api/stores                  - Create (admin)
//! GET    /api/stores/{id}             - Single store
//! PUT    /api/stores/{id}             - Update (admin)
//! DELETE /api/stores/{id}             - Delete (admin)
//!
//! # Ratings
//! POST   /api/ratings                 - Submit or overwrite own rating
//! GET    /api/ratings/user/{userId}   - A user's ratings
//! GET    /api/ratings/store/{storeId} - A store's ratings, paged
//! DELETE /api/ratings/{id}            - Delete a rating
//!
//! # Dashboards
//! GET    /api/dashboard/admin         - System-wide figures
//! GET    /api/dashboard/owner         - Own stores' breakdown
//! ```

pub mod auth;
pub mod dashboard;
pub mod ratings;
pub mod stores;
pub mod users;

use axum::{
    Router,
    extract::{FromRequest, FromRequestParts},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};

use storerate_core::query::{Matcher, StoreField, UserField};
use storerate_core::{ListQuery, PageRequest, SortOrder, ValidationErrors};

use crate::error::AppError;
use crate::middleware::login_rate_limiter;
use crate::state::AppState;

// =============================================================================
// Extractors
// =============================================================================

/// `Json` whose rejection is an [`AppError`] validation body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// `Query` whose rejection is an [`AppError`] validation body.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// `Path` whose rejection is an [`AppError`] validation body.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

/// A mutation result echoed with a human-readable message.
#[derive(Debug, Serialize)]
pub struct Message<T> {
    pub message: &'static str,
    #[serde(flatten)]
    pub body: T,
}

// =============================================================================
// Listing parameters
// =============================================================================

/// Raw listing query parameters. Numbers stay strings until validated so a
/// bad value is reported as a field error rather than a parse failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub role: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl ListParams {
    /// A user listing: substring filters on name, email and address, exact
    /// match on role.
    ///
    /// # Errors
    ///
    /// Every invalid sort or paging parameter.
    pub fn user_query(&self) -> Result<ListQuery<UserField>, ValidationErrors> {
        let (sort_by, sort_order, page) = self.common()?;
        Ok(ListQuery::default()
            .filter(UserField::Name, contains(self.name.as_deref()))
            .filter(UserField::Email, contains(self.email.as_deref()))
            .filter(UserField::Address, contains(self.address.as_deref()))
            .filter(
                UserField::Role,
                Matcher::Exact(self.role.as_deref().unwrap_or_default().trim().to_owned()),
            )
            .sort(sort_by, sort_order)
            .page(page))
    }

    /// A store listing: substring filters on name, email and address.
    ///
    /// # Errors
    ///
    /// Every invalid sort or paging parameter.
    pub fn store_query(&self) -> Result<ListQuery<StoreField>, ValidationErrors> {
        let (sort_by, sort_order, page) = self.common()?;
        Ok(ListQuery::default()
            .filter(StoreField::Name, contains(self.name.as_deref()))
            .filter(StoreField::Email, contains(self.email.as_deref()))
            .filter(StoreField::Address, contains(self.address.as_deref()))
            .sort(sort_by, sort_order)
            .page(page))
    }

    /// Only `page` and `limit`.
    ///
    /// # Errors
    ///
    /// A field error per invalid value.
    pub fn page_request(&self) -> Result<PageRequest, ValidationErrors> {
        PageRequest::new(
            number(self.page.as_deref()),
            number(self.limit.as_deref()),
        )
    }

    fn common<F>(&self) -> Result<(F, SortOrder, PageRequest), ValidationErrors>
    where
        F: std::str::FromStr<Err = storerate_core::FieldError> + Default,
    {
        let mut errors = ValidationErrors::default();

        let sort_by = self
            .sort_by
            .as_deref()
            .map_or_else(|| Ok(F::default()), str::parse);
        let sort_order = self
            .sort_order
            .as_deref()
            .map_or(Ok(SortOrder::Asc), str::parse);
        let page = self.page_request();

        let sort_by = sort_by.map_err(|e| errors.push(e)).ok();
        let sort_order = sort_order.map_err(|e| errors.push(e)).ok();
        let page = page
            .map_err(|e| e.errors().iter().cloned().for_each(|f| errors.push(f)))
            .ok();

        match (sort_by, sort_order, page) {
            (Some(sort_by), Some(sort_order), Some(page)) => Ok((sort_by, sort_order, page)),
            _ => Err(errors),
        }
    }
}

fn contains(value: Option<&str>) -> Matcher {
    Matcher::Contains(value.unwrap_or_default().trim().to_owned())
}

/// Parse an optional numeric parameter. Anything unparseable becomes `0`,
/// which paging validation then rejects with its own message.
fn number(value: Option<&str>) -> Option<i64> {
    value.map(|v| v.trim().parse().unwrap_or(0))
}

// =============================================================================
// Routers
// =============================================================================

/// Create the auth routes router.
pub fn auth_routes(rate_limit_login: bool) -> Router<AppState> {
    let login = if rate_limit_login {
        post(auth::login).layer(login_rate_limiter())
    } else {
        post(auth::login)
    };

    Router::new()
        .route("/register", post(auth::register))
        .route("/login", login)
        .route("/password", put(auth::update_password))
        .route("/me", get(auth::me))
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::index).post(users::create))
        .route(
            "/{id}",
            get(users::show).put(users::update).delete(users::delete),
        )
}

/// Create the store routes router.
pub fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(stores::index).post(stores::create))
        .route(
            "/{id}",
            get(stores::show).put(stores::update).delete(stores::delete),
        )
}

/// Create the rating routes router.
pub fn rating_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(ratings::submit))
        .route("/user/{user_id}", get(ratings::for_user))
        .route("/store/{store_id}", get(ratings::for_store))
        .route("/{id}", axum::routing::delete(ratings::delete))
}

/// Create the dashboard routes router.
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/admin", get(dashboard::admin))
        .route("/owner", get(dashboard::owner))
}

/// Create all `/api` routes.
pub fn routes(rate_limit_login: bool) -> Router<AppState> {
    Router::new()
        .nest("/api/auth", auth_routes(rate_limit_login))
        .nest("/api/users", user_routes())
        .nest("/api/stores", store_routes())
        .nest("/api/ratings", rating_routes())
        .nest("/api/dashboard", dashboard_routes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> ListParams {
        let query = pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        let uri: axum::http::Uri = format!("/?{query}").parse().unwrap();
        axum::extract::Query::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn test_defaults() {
        let query = ListParams::default().user_query().unwrap();
        assert!(query.filters.is_empty());
        assert_eq!(query.sort_by, UserField::Name);
        assert_eq!(query.sort_order, SortOrder::Asc);
        assert_eq!(query.page, PageRequest::default());
    }

    #[test]
    fn test_user_filters_and_sort() {
        let query = params(&[
            ("name", "smith"),
            ("role", "OWNER"),
            ("sortBy", "email"),
            ("sortOrder", "desc"),
            ("page", "2"),
            ("limit", "5"),
        ])
        .user_query()
        .unwrap();

        assert_eq!(query.filters.len(), 2);
        assert_eq!(query.sort_by, UserField::Email);
        assert_eq!(query.sort_order, SortOrder::Desc);
        assert_eq!(query.page.page(), 2);
        assert_eq!(query.page.limit(), 5);
    }

    #[test]
    fn test_bad_parameters_reported_together() {
        let errors = params(&[("sortBy", "password"), ("sortOrder", "up"), ("limit", "500")])
            .store_query()
            .unwrap_err();
        let fields: Vec<&str> = errors.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["sortBy", "sortOrder", "limit"]);
    }

    #[test]
    fn test_non_numeric_page_is_field_error() {
        let errors = params(&[("page", "abc")]).page_request().unwrap_err();
        assert_eq!(errors.errors().first().unwrap().field, "page");
    }
}
