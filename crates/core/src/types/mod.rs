//! Core types for StoreRate.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod rating;
pub mod role;
pub mod text;
pub mod validation;

pub use email::{Email, EmailError};
pub use id::*;
pub use rating::RatingValue;
pub use role::Role;
pub use text::{Address, DisplayName, Password};
pub use validation::{FieldError, ValidationErrors};
