//! The permission gate.
//!
//! [`allow`] is the single source of truth for authorization. Every mutating
//! or scoped read asks it first, through [`authorize`], before any data is
//! loaded or changed.
//!
//! # Rules
//!
//! ```text
//! Action                 ADMIN       OWNER              USER
//! ManageUsers/Stores     allow       deny               deny
//! ListUsers/Stores       allow       allow (read-only)  allow (read-only)
//! SubmitRating           deny        deny               allow
//! ViewStoreRatings       allow       own stores only    allow (own view)
//! DeleteRating           allow       deny               own ratings only
//! ViewAdminDashboard     allow       deny               deny
//! ViewOwnerDashboard     deny        allow              deny
//! ViewUserRatings        allow       self only          self only
//! ```

use serde::Serialize;

use crate::types::{Email, Role, UserId};

/// The authenticated identity making a request.
///
/// Resolved once per request from the stored user record and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: UserId,
    pub role: Role,
    pub name: String,
    pub email: Email,
}

/// Something a principal wants to do.
///
/// Scoped actions carry the id of the user who owns the target resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ListUsers,
    ManageUsers,
    ListStores,
    ManageStores,
    SubmitRating,
    /// Read the ratings of a store owned by `owner_id`.
    ViewStoreRatings { owner_id: UserId },
    /// Delete a rating written by `author_id`.
    DeleteRating { author_id: UserId },
    ViewAdminDashboard,
    ViewOwnerDashboard,
    /// Read every rating written by `user_id`.
    ViewUserRatings { user_id: UserId },
}

impl Action {
    /// Message shown to a principal the gate turned away.
    #[must_use]
    pub const fn denial_message(self) -> &'static str {
        match self {
            Self::ManageUsers | Self::ManageStores | Self::ViewAdminDashboard => {
                "Access denied. Admin only."
            }
            Self::ListUsers | Self::ListStores => "Access denied.",
            Self::SubmitRating => "Only normal users can submit ratings",
            Self::ViewStoreRatings { .. } => {
                "Access denied. You can only view ratings for your own store."
            }
            Self::DeleteRating { .. } => "Access denied. You can only delete your own ratings.",
            Self::ViewOwnerDashboard => "Access denied. Store owner only.",
            Self::ViewUserRatings { .. } => "Access denied. You can only view your own ratings.",
        }
    }
}

/// Returned by [`authorize`] when the gate denies an action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", action.denial_message())]
pub struct Denied {
    pub action: Action,
    pub role: Role,
}

/// Decide whether `principal` may perform `action`.
///
/// The table is total: every role is matched explicitly for every action.
#[must_use]
pub fn allow(principal: &Principal, action: Action) -> bool {
    use Action as A;
    use Role::{Admin, Owner, User};

    match (principal.role, action) {
        (Admin, A::ManageUsers | A::ManageStores) => true,
        (Owner | User, A::ManageUsers | A::ManageStores) => false,

        (Admin | Owner | User, A::ListUsers | A::ListStores) => true,

        (User, A::SubmitRating) => true,
        (Admin | Owner, A::SubmitRating) => false,

        (Admin | User, A::ViewStoreRatings { .. }) => true,
        (Owner, A::ViewStoreRatings { owner_id }) => owner_id == principal.id,

        (Admin, A::DeleteRating { .. }) => true,
        (Owner, A::DeleteRating { .. }) => false,
        (User, A::DeleteRating { author_id }) => author_id == principal.id,

        (Admin, A::ViewAdminDashboard) => true,
        (Owner | User, A::ViewAdminDashboard) => false,

        (Owner, A::ViewOwnerDashboard) => true,
        (Admin | User, A::ViewOwnerDashboard) => false,

        (Admin, A::ViewUserRatings { .. }) => true,
        (Owner | User, A::ViewUserRatings { user_id }) => user_id == principal.id,
    }
}

/// [`allow`] as a `Result`, for use with `?`.
///
/// # Errors
///
/// Returns [`Denied`] when the gate refuses the action.
pub fn authorize(principal: &Principal, action: Action) -> Result<(), Denied> {
    if allow(principal, action) {
        Ok(())
    } else {
        Err(Denied {
            action,
            role: principal.role,
        })
    }
}
