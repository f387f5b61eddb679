//! Page arithmetic shared by list endpoints.

use serde::Serialize;

pub const DEFAULT_PER_PAGE: i64 = 10;
pub const MAX_PER_PAGE: i64 = 100;

/// A validated page request: both values are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PageRequest {
    /// Rows to skip before this page starts.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

/// Pagination block returned alongside list data.
///
/// ```json
/// { "current_page": 2, "total_pages": 3, "per_page": 10, "total": 25 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub per_page: i64,
    pub total: i64,
}

impl Pagination {
    /// An empty result set still has one (empty) page.
    pub fn new(request: PageRequest, total: i64) -> Self {
        let total_pages = if total <= 0 {
            1
        } else {
            (total + request.per_page - 1) / request.per_page
        };

        Self {
            current_page: request.page,
            total_pages,
            per_page: request.per_page,
            total: total.max(0),
        }
    }
}
