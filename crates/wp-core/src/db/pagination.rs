//! Pagination types for list queries.

use serde::{Deserialize, Serialize};

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Maximum allowed items per page.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination options for database queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Page number (1-indexed).
    pub page: u32,
    /// Items per page.
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    /// Creates a new Pagination.
    ///
    /// Page values below 1 are clamped to 1 and `per_page` is clamped to
    /// `[1, MAX_PAGE_SIZE]`.
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Creates a Pagination from optional query parameters with defaults.
    pub fn from_query(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self::new(page.unwrap_or(1), per_page.unwrap_or(DEFAULT_PAGE_SIZE))
    }

    /// Row offset for LIMIT/OFFSET queries.
    pub fn offset(&self) -> u32 {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }

    pub fn limit(&self) -> u32 {
        self.per_page
    }

    /// Total number of pages for a given item count. Never less than 1.
    pub fn total_pages(&self, total_items: u64) -> u32 {
        if total_items == 0 {
            return 1;
        }
        total_items.div_ceil(self.per_page as u64) as u32
    }
}

/// A page of items plus the totals needed to render pagination controls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    /// Total number of items matching the query (across all pages).
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl<T> PaginatedResult<T> {
    pub fn new(items: Vec<T>, total: u64, pagination: &Pagination) -> Self {
        Self {
            items,
            total,
            page: pagination.page,
            per_page: pagination.per_page,
            total_pages: pagination.total_pages(total),
        }
    }

    /// Maps the items to a different type.
    pub fn map<U, F>(self, f: F) -> PaginatedResult<U>
    where
        F: FnMut(T) -> U,
    {
        PaginatedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            total_pages: self.total_pages,
        }
    }
}
