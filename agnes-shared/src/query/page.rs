//! Page requests and pagination metadata

use serde::{Deserialize, Serialize};

use super::QueryError;

/// A validated `(page, items_per_page)` pair. Both are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    items_per_page: i64,
}

impl PageRequest {
    pub fn new(page: i64, items_per_page: i64) -> Result<Self, QueryError> {
        if page < 1 {
            return Err(QueryError::InvalidPageRequest(
                "page must be greater than 0".to_string(),
            ));
        }
        if items_per_page < 1 {
            return Err(QueryError::InvalidPageRequest(
                "items_per_page must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            page,
            items_per_page,
        })
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn items_per_page(&self) -> i64 {
        self.items_per_page
    }

    /// Number of records skipped before this page
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.items_per_page)
    }

    pub fn limit(&self) -> i64 {
        self.items_per_page
    }
}

/// Pagination metadata returned alongside every list response.
///
/// `first_item` and `last_item` are 1-based positions in the filtered set.
/// For an empty set `last_page` is `0`; for a page past the end
/// `first_item` exceeds `last_item`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub current_page: i64,
    pub last_page: i64,
    pub first_item: i64,
    pub last_item: i64,
    pub items_per_page: i64,
    pub total: i64,
}

impl PageMeta {
    pub fn compute(request: PageRequest, total: i64) -> Self {
        let offset = request.offset();
        let items_per_page = request.items_per_page();

        let last_page = if total > 0 {
            (total - 1) / items_per_page + 1
        } else {
            0
        };

        Self {
            current_page: request.page(),
            last_page,
            first_item: offset.saturating_add(1),
            last_item: offset.saturating_add(items_per_page).min(total),
            items_per_page,
            total,
        }
    }
}

/// One page of records plus its metadata
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Page<T> {
    pub fn empty(request: PageRequest) -> Self {
        Self {
            items: Vec::new(),
            meta: PageMeta::compute(request, 0),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}
