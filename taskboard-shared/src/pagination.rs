/// Offset pagination for list endpoints
///
/// Lists accept `limit` and `offset` query parameters and answer with a
/// [`Page`] envelope:
///
/// ```json
/// { "data": [...], "total": 15, "limit": 10, "offset": 10, "hasMore": false }
/// ```
///
/// Queries backing a page must order by a total order (ending in `id`) so
/// consecutive pages never overlap.

use serde::Serialize;

/// Page size when `limit` is omitted
pub const DEFAULT_LIMIT: i64 = 20;

/// Upper bound on `limit`
pub const MAX_LIMIT: i64 = 100;

/// Normalized `limit`/`offset` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    limit: i64,
    offset: i64,
}

impl PageParams {
    /// Builds params from raw query values, clamping `limit` to `1..=MAX_LIMIT`
    /// and `offset` to `>= 0`
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        }
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// List response envelope
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Items on this page
    pub data: Vec<T>,

    /// Total matching rows across all pages
    pub total: i64,

    /// Effective page size
    pub limit: i64,

    /// Effective offset
    pub offset: i64,

    /// Whether rows exist past this page
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: i64, params: PageParams) -> Self {
        let has_more = params.offset() + (data.len() as i64) < total;

        Self {
            data,
            total,
            limit: params.limit(),
            offset: params.offset(),
            has_more,
        }
    }

    /// Converts the items while keeping the pagination metadata
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            data: self.data.into_iter().map(f).collect(),
            total: self.total,
            limit: self.limit,
            offset: self.offset,
            has_more: self.has_more,
        }
    }
}
