//! Domain models and request payloads.
//!
//! Model types are what the services hand back to routes; they serialize
//! straight into response bodies (camelCase keys, never a password hash).
//! Request types are deserialized from raw JSON and turned into validated
//! domain values by their `validate` methods, which report every failing
//! field at once.

pub mod rating;
pub mod store;
pub mod user;

pub use rating::{Rating, RatingSample, RatingView, SampleScope, StoreRef, SubmitRatingRequest};
pub use store::{NewStore, Store, StoreChanges, StoreRequest};
pub use user::{
    CreateUserRequest, LoginRequest, NewUser, RegisterRequest, UpdatePasswordRequest,
    UpdateUserRequest, User, UserChanges, UserRef,
};

use storerate_core::{Email, Role};

const INVALID_EMAIL: &str = "Please provide a valid email";
const INVALID_ROLE: &str = "Role must be ADMIN, USER, or OWNER";

/// Parse an email, collapsing every failure into the single client message.
fn parse_email(raw: &str) -> Result<Email, &'static str> {
    Email::parse(raw.trim()).map_err(|_| INVALID_EMAIL)
}

fn parse_role(raw: &str) -> Result<Role, &'static str> {
    raw.parse().map_err(|_| INVALID_ROLE)
}
