//! Filtering, sorting and pagination of entity listings.
//!
//! A [`ListQuery`] describes a listing independently of where the rows live.
//! [`query`] evaluates it over an in-memory collection; the Postgres adapter
//! translates the same value to SQL, so both produce identical pages.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{FieldError, ValidationErrors};

// =============================================================================
// Sorting
// =============================================================================

/// Direction of a sort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// SQL keyword for this direction.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// Apply this direction to an ascending comparison.
    #[must_use]
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

impl FromStr for SortOrder {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Self::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Self::Desc)
        } else {
            Err(FieldError::new("sortOrder", "Sort order must be asc or desc"))
        }
    }
}

// =============================================================================
// Fields
// =============================================================================

/// Fields a user listing can be filtered or sorted by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum UserField {
    #[default]
    Name,
    Email,
    Address,
    Role,
    CreatedAt,
}

/// Fields a store listing can be filtered or sorted by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StoreField {
    #[default]
    Name,
    Email,
    Address,
    CreatedAt,
}

impl UserField {
    /// Name of the field as clients send it.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Address => "address",
            Self::Role => "role",
            Self::CreatedAt => "createdAt",
        }
    }

    /// Whether sorting on this field uses [`compare_text`].
    #[must_use]
    pub const fn is_free_text(self) -> bool {
        matches!(self, Self::Name | Self::Email | Self::Address)
    }
}

impl StoreField {
    /// Name of the field as clients send it.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Address => "address",
            Self::CreatedAt => "createdAt",
        }
    }

    /// Whether sorting on this field uses [`compare_text`].
    #[must_use]
    pub const fn is_free_text(self) -> bool {
        matches!(self, Self::Name | Self::Email | Self::Address)
    }
}

/// Ascending order for free text: case-insensitive first, then by the exact
/// bytes so the order stays total. The Postgres adapter renders the same
/// order as `LOWER(col), col COLLATE "C"`.
#[must_use]
pub fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

impl FromStr for UserField {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Self::Name),
            "email" => Ok(Self::Email),
            "address" => Ok(Self::Address),
            "role" => Ok(Self::Role),
            "createdAt" => Ok(Self::CreatedAt),
            _ => Err(FieldError::new(
                "sortBy",
                "Sort field must be one of name, email, address, role, createdAt",
            )),
        }
    }
}

impl FromStr for StoreField {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Self::Name),
            "email" => Ok(Self::Email),
            "address" => Ok(Self::Address),
            "createdAt" => Ok(Self::CreatedAt),
            _ => Err(FieldError::new(
                "sortBy",
                "Sort field must be one of name, email, address, createdAt",
            )),
        }
    }
}

// =============================================================================
// Filters
// =============================================================================

/// How a filter compares a field against its operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Case-insensitive substring match.
    Contains(String),
    /// Exact, case-sensitive equality.
    Exact(String),
}

impl Matcher {
    /// Whether `value` satisfies this matcher.
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Contains(needle) => value.to_lowercase().contains(&needle.to_lowercase()),
            Self::Exact(expected) => value == expected,
        }
    }
}

/// A single field constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter<F> {
    pub field: F,
    pub matcher: Matcher,
}

// =============================================================================
// Pagination
// =============================================================================

/// A validated, 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    pub const DEFAULT_PAGE: u32 = 1;
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    /// Validate optional `page` and `limit` values, applying defaults.
    ///
    /// # Errors
    ///
    /// Returns one field error per invalid value: `page` must be at least 1
    /// and `limit` between 1 and 100.
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let page = match page {
            None => Some(Self::DEFAULT_PAGE),
            Some(p) => u32::try_from(p).ok().filter(|p| *p >= 1),
        };
        if page.is_none() {
            errors.push(FieldError::new("page", "Page must be a positive integer"));
        }

        let limit = match limit {
            None => Some(Self::DEFAULT_LIMIT),
            Some(l) => u32::try_from(l)
                .ok()
                .filter(|l| (1..=Self::MAX_LIMIT).contains(l)),
        };
        if limit.is_none() {
            errors.push(FieldError::new("limit", "Limit must be between 1 and 100"));
        }

        match (page, limit) {
            (Some(page), Some(limit)) => Ok(Self { page, limit }),
            _ => Err(errors),
        }
    }

    #[must_use]
    pub const fn page(self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn limit(self) -> u32 {
        self.limit
    }

    /// Number of rows skipped before this page.
    #[must_use]
    pub const fn offset(self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: Self::DEFAULT_PAGE,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

/// Pagination metadata returned with every listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Rows matching the filters, across all pages.
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl Pagination {
    #[must_use]
    pub const fn new(total: u64, request: PageRequest) -> Self {
        Self {
            total,
            page: request.page,
            limit: request.limit,
            total_pages: total.div_ceil(request.limit as u64),
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    /// Transform each item, keeping the pagination.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }

    /// Paginate an already filtered and ordered list.
    #[must_use]
    pub fn slice(rows: Vec<T>, request: PageRequest) -> Self {
        let total = rows.len() as u64;
        let skip = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let items = rows
            .into_iter()
            .skip(skip)
            .take(request.limit as usize)
            .collect();
        Self {
            items,
            pagination: Pagination::new(total, request),
        }
    }
}

// =============================================================================
// Query
// =============================================================================

/// An entity that can be listed with a [`ListQuery`].
pub trait Queryable {
    /// Field selector used by filters and sorting.
    type Field: Copy;
    /// Primary key, used to break sort ties.
    type Key: Ord;

    fn key(&self) -> Self::Key;

    /// Textual value of `field`, as filters see it.
    fn text(&self, field: Self::Field) -> Cow<'_, str>;

    /// Ascending comparison on `field`.
    fn compare(&self, other: &Self, field: Self::Field) -> Ordering;
}

/// A complete listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery<F> {
    pub filters: Vec<Filter<F>>,
    pub sort_by: F,
    pub sort_order: SortOrder,
    pub page: PageRequest,
}

impl<F: Default> Default for ListQuery<F> {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            sort_by: F::default(),
            sort_order: SortOrder::Asc,
            page: PageRequest::default(),
        }
    }
}

impl<F> ListQuery<F> {
    /// Add a filter. Empty operands are ignored, so absent query parameters
    /// match everything.
    #[must_use]
    pub fn filter(mut self, field: F, matcher: Matcher) -> Self {
        let operand = match &matcher {
            Matcher::Contains(s) | Matcher::Exact(s) => s,
        };
        if !operand.is_empty() {
            self.filters.push(Filter { field, matcher });
        }
        self
    }

    #[must_use]
    pub fn sort(mut self, sort_by: F, sort_order: SortOrder) -> Self {
        self.sort_by = sort_by;
        self.sort_order = sort_order;
        self
    }

    #[must_use]
    pub const fn page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }
}

/// Evaluate `list` over `items`.
///
/// Filters are conjunctive. Ties on the sort field fall back to ascending
/// primary key, whatever the requested direction.
pub fn query<T: Queryable>(
    items: impl IntoIterator<Item = T>,
    list: &ListQuery<T::Field>,
) -> Page<T> {
    let mut rows: Vec<T> = items
        .into_iter()
        .filter(|item| {
            list.filters
                .iter()
                .all(|f| f.matcher.matches(&item.text(f.field)))
        })
        .collect();

    rows.sort_by(|a, b| {
        list.sort_order
            .apply(a.compare(b, list.sort_by))
            .then_with(|| a.key().cmp(&b.key()))
    });

    Page::slice(rows, list.page)
}
