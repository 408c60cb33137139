//! Query parameters and pagination utilities

use crate::orders::model::OrderStatus;
use serde::{Deserialize, Serialize};

/// Query parameters accepted by the order listing
///
/// All parameters are optional. Pagination values are clamped by
/// [`OrderFilter::from_params`] using the configured page sizes.
///
/// # Example
/// ```text
/// GET /orders?page=2&limit=10
/// GET /orders?search=pérez&status=EN_PROCESO&year=2025
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct OrderQueryParams {
    /// Page number (starts at 1)
    pub page: Option<usize>,

    /// Number of orders per page
    pub limit: Option<usize>,

    /// Case-insensitive substring matched against client name and surname
    pub search: Option<String>,

    /// Only orders in this status
    pub status: Option<OrderStatus>,

    /// Only orders recorded for this year
    pub year: Option<i32>,
}

/// Normalized listing filter handed to the storage layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderFilter {
    pub search: Option<String>,
    pub status: Option<OrderStatus>,
    pub year: Option<i32>,
    pub page: usize,
    pub limit: usize,
}

impl Default for OrderFilter {
    fn default() -> Self {
        Self {
            search: None,
            status: None,
            year: None,
            page: 1,
            limit: 20,
        }
    }
}

impl OrderFilter {
    /// Build a filter from raw query parameters
    pub fn from_params(params: OrderQueryParams, default_limit: usize, max_limit: usize) -> Self {
        let search = params
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Self {
            search,
            status: params.status,
            year: params.year,
            page: params.page.unwrap_or(1).max(1),
            limit: params
                .limit
                .unwrap_or(default_limit)
                .clamp(1, max_limit.max(1)),
        }
    }

    /// Number of rows to skip, saturating for out-of-range pages
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    /// Whether a client name/surname pair matches the search term
    pub fn matches_search(&self, name: &str, surname: Option<&str>) -> bool {
        let Some(term) = &self.search else {
            return true;
        };
        let term = term.to_lowercase();
        name.to_lowercase().contains(&term)
            || surname.is_some_and(|s| s.to_lowercase().contains(&term))
    }
}

/// A page of results plus the total number of matches
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}

/// Paginated response structure
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    /// The paginated data
    pub data: Vec<T>,

    /// Pagination metadata
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct PaginationMeta {
    /// Current page number (starts at 1)
    pub page: usize,

    /// Number of items per page
    pub limit: usize,

    /// Total number of items (after filters)
    pub total: usize,

    /// Total number of pages
    pub total_pages: usize,

    /// Whether there is a next page
    pub has_next: bool,

    /// Whether there is a previous page
    pub has_prev: bool,
}

impl PaginationMeta {
    /// Create pagination metadata from calculation
    pub fn new(page: usize, limit: usize, total: usize) -> Self {
        let limit = limit.max(1);
        let page = page.max(1);
        let total_pages = if total == 0 { 0 } else { total.div_ceil(limit) };
        let start = (page - 1).saturating_mul(limit);

        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: start.saturating_add(limit) < total,
            has_prev: page > 1,
        }
    }
}
