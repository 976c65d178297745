//! StoreRate Core - Shared domain library.
//!
//! This crate provides the pieces of StoreRate that do not touch I/O. It is
//! used by:
//! - `api` - JSON HTTP service and persistence adapters
//! - `cli` - Command-line tools for migrations, seeding and bootstrap
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no database access,
//! no HTTP. Everything here can be evaluated over in-memory collections, which
//! keeps authorization and statistics testable without a running database.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, roles, validated text and rating values
//! - [`permission`] - The permission gate deciding who may do what
//! - [`aggregate`] - Averages, distributions and rankings over rating values
//! - [`query`] - Filtering, sorting and pagination of entity collections

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod aggregate;
pub mod permission;
pub mod query;
pub mod types;

pub use permission::{Action, Denied, Principal, allow, authorize};
pub use query::{ListQuery, Page, PageRequest, Pagination, SortOrder};
pub use types::*;
