//! Search request normalization and the paged response shape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::storage::SearchQuery;

/// Page size used when the client sends none, or a non-positive one.
pub const DEFAULT_RESULTS: u64 = 100;

/// Page used when the client sends none, or a non-positive one.
pub const DEFAULT_PAGE: u64 = 1;

/// Body of `POST /search`.
///
/// Fields other than `page` and `results` are kept as filters.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchRequest {
    /// Requested page, 1-based.
    #[serde(default)]
    pub page: Option<i64>,
    /// Requested page size.
    #[serde(default)]
    pub results: Option<i64>,
    /// Everything else in the body.
    #[serde(flatten)]
    pub filters: Map<String, Value>,
}

/// Floor-correct a client value: anything below 1 becomes `default`.
fn floor_or(value: Option<i64>, default: u64) -> u64 {
    match value {
        Some(v) if v > 0 => v.unsigned_abs(),
        _ => default,
    }
}

impl SearchRequest {
    /// Normalized page number.
    pub fn page(&self) -> u64 {
        floor_or(self.page, DEFAULT_PAGE)
    }

    /// Normalized page size. No upper bound is enforced.
    pub fn results(&self) -> u64 {
        floor_or(self.results, DEFAULT_RESULTS)
    }

    /// Turn the request into the query storage receives.
    pub fn into_query(self) -> SearchQuery {
        let page = self.page();
        let results = self.results();
        SearchQuery {
            page,
            results,
            offset: offset(page, results),
            filters: self.filters,
        }
    }
}

/// First item of `page` when pages hold `results` items.
///
/// Saturates instead of overflowing; such an offset is past any dataset.
pub fn offset(page: u64, results: u64) -> u64 {
    page.saturating_sub(1).saturating_mul(results)
}

/// Body returned by `POST /search`.
///
/// `total` counts the items of this page only, not every match in the
/// registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    /// Items as returned by storage.
    pub results: Vec<Value>,
    /// Page echoed from the normalized request.
    pub page: u64,
    /// Number of items in `results`.
    pub total: usize,
}

impl SearchResponse {
    /// Wrap one page of results.
    pub fn new(results: Vec<Value>, page: u64) -> Self {
        let total = results.len();
        Self {
            results,
            page,
            total,
        }
    }
}
