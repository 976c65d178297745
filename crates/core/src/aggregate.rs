//! Statistics over rating values.
//!
//! Everything here works in full precision. [`round2`] is applied once, when a
//! response is built, so intermediate results never accumulate rounding error.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::{RatingValue, StoreId};

/// Number of stores shown in a dashboard ranking.
pub const TOP_STORES: usize = 5;

/// Round to two decimal places.
#[must_use]
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Arithmetic mean of `values`, or `None` when there are none.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[RatingValue]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: u64 = values.iter().map(|v| u64::from(v.get())).sum();
    Some(sum as f64 / values.len() as f64)
}

/// Mean rounded for display; `0` when there are no ratings.
#[must_use]
pub fn average(values: &[RatingValue]) -> f64 {
    mean(values).map_or(0.0, round2)
}

/// Count of ratings per star value.
///
/// Every key from 1 to 5 is present, even when its count is zero.
#[must_use]
pub fn distribution(values: &[RatingValue]) -> BTreeMap<u8, u64> {
    let mut counts: BTreeMap<u8, u64> = (RatingValue::MIN..=RatingValue::MAX)
        .map(|star| (star, 0))
        .collect();
    for value in values {
        *counts.entry(value.get()).or_default() += 1;
    }
    counts
}

/// Group `(key, value)` pairs into per-key value lists.
pub fn group_by<K: Ord>(
    pairs: impl IntoIterator<Item = (K, RatingValue)>,
) -> BTreeMap<K, Vec<RatingValue>> {
    let mut groups: BTreeMap<K, Vec<RatingValue>> = BTreeMap::new();
    for (key, value) in pairs {
        groups.entry(key).or_default().push(value);
    }
    groups
}

/// Unrounded rating statistics for a single store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub store_id: StoreId,
    /// Full-precision mean, `0` when `count` is zero.
    pub average: f64,
    pub count: u64,
}

impl StoreStats {
    /// Compute the statistics of one store from its rating values.
    #[must_use]
    pub fn from_values(store_id: StoreId, values: &[RatingValue]) -> Self {
        Self {
            store_id,
            average: mean(values).unwrap_or(0.0),
            count: values.len() as u64,
        }
    }
}

/// The `n` best-rated stores.
///
/// Stores with no ratings are never ranked. Order is average descending, then
/// rating count descending, then store id ascending, which makes it total.
#[must_use]
pub fn rank_stores(stats: impl IntoIterator<Item = StoreStats>, n: usize) -> Vec<StoreStats> {
    let mut ranked: Vec<StoreStats> = stats.into_iter().filter(|s| s.count > 0).collect();
    ranked.sort_by(|a, b| {
        b.average
            .total_cmp(&a.average)
            .then_with(|| b.count.cmp(&a.count))
            .then_with(|| a.store_id.cmp(&b.store_id))
    });
    ranked.truncate(n);
    ranked
}

/// Rating-count weighted mean across several stores.
///
/// Returns `None` when the stores have no ratings at all.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn weighted_owner_average(per_store: &[StoreStats]) -> Option<f64> {
    let total: u64 = per_store.iter().map(|s| s.count).sum();
    if total == 0 {
        return None;
    }
    let weighted: f64 = per_store.iter().map(|s| s.average * s.count as f64).sum();
    Some(weighted / total as f64)
}
