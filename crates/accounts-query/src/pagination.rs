//! Page request and response types.

use crate::error::{ParamError, QueryError};
use crate::sql_builder::Pagination;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 1000;

/// What to do when a page past the last one is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageOverflow {
    /// Return the page with no items.
    #[default]
    Empty,
    /// Fail with a page-not-found error.
    Reject,
}

/// A validated 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    page: u32,
    size: u32,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageParams {
    /// Validate `page >= 1` and `1 <= size <= max_size`.
    pub fn new(page: u32, size: u32, max_size: u32) -> Result<Self, ParamError> {
        if page < 1 {
            return Err(QueryError::OutOfRange("page must be at least 1".into()).for_param("page"));
        }
        if !(1..=max_size).contains(&size) {
            return Err(QueryError::OutOfRange(format!(
                "size must be between 1 and {max_size}"
            ))
            .for_param("size"));
        }
        Ok(Self { page, size })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.size)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.size)
    }

    pub fn to_pagination(&self) -> Pagination {
        Pagination::new(self.limit(), self.offset())
    }

    /// Number of pages needed for `total` items.
    pub fn pages_for(&self, total: u64) -> u64 {
        total.div_ceil(self.limit())
    }

    /// Whether this page lies past the last one. The first page always exists.
    pub fn is_past_end(&self, total: u64) -> bool {
        u64::from(self.page) > self.pages_for(total).max(1)
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub size: u32,
    pub pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, params: PageParams) -> Self {
        Self {
            items,
            total,
            page: params.page(),
            size: params.size(),
            pages: params.pages_for(total),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            size: self.size,
            pages: self.pages,
        }
    }
}
