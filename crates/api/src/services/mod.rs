//! Business logic between routes and storage.
//!
//! Each service borrows the repository for the length of one request. Every
//! operation asks the permission gate before it reads scoped data or writes
//! anything.

pub mod auth;
pub mod dashboard;
pub mod ratings;
pub mod stores;
pub mod users;

pub use auth::AuthService;
pub use dashboard::DashboardService;
pub use ratings::RatingService;
pub use stores::StoreService;
pub use users::UserService;

use crate::db::RepositoryError;
use crate::error::AppError;

/// Map a repository `NotFound` to a client-facing "`<what>` not found".
fn or_not_found(what: &'static str) -> impl FnOnce(RepositoryError) -> AppError {
    move |err| match err {
        RepositoryError::NotFound => AppError::not_found(what),
        other => other.into(),
    }
}
