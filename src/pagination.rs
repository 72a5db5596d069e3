//! Page-number pagination shared by every list endpoint.

use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use crate::config::AppConfig;
use crate::error::{ApiError, validation_error};

/// Maximum accepted length of a search term, in characters.
pub const MAX_SEARCH_LEN: usize = 100;

/// `?page=&limit=` query parameters
#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// 1-based page number (default 1)
    pub page: Option<u64>,
    /// Page size (default and maximum come from configuration)
    pub limit: Option<u64>,
}

/// `?q=&page=&limit=` query parameters
#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Text matched against the resource's searchable columns
    pub q: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl SearchParams {
    /// Returns the trimmed search term, rejecting empty or overlong input.
    pub fn term(&self) -> Result<&str, ApiError> {
        let term = self.q.as_deref().map(str::trim).unwrap_or_default();
        if term.is_empty() {
            return Err(validation_error(
                "Search term is required",
                json!({ "q": "must not be empty" }),
            ));
        }
        if term.chars().count() > MAX_SEARCH_LEN {
            return Err(validation_error(
                "Search term is too long",
                json!({ "q": format!("must be at most {MAX_SEARCH_LEN} characters") }),
            ));
        }
        Ok(term)
    }
}

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    /// Applies configured defaults and bounds to raw query values.
    pub fn resolve(
        page: Option<u64>,
        limit: Option<u64>,
        config: &AppConfig,
    ) -> Result<Self, ApiError> {
        let page = page.unwrap_or(1);
        if page == 0 {
            return Err(validation_error(
                "Invalid page",
                json!({ "page": "must be at least 1" }),
            ));
        }

        let limit = limit.unwrap_or(config.default_page_size);
        if limit == 0 || limit > config.max_page_size {
            return Err(validation_error(
                "Invalid limit",
                json!({ "limit": format!("must be between 1 and {}", config.max_page_size) }),
            ));
        }

        let in_range = (page - 1)
            .checked_mul(limit)
            .is_some_and(|offset| offset <= i64::MAX as u64);
        if !in_range {
            return Err(validation_error(
                "Invalid page",
                json!({ "page": "is too large for the page size" }),
            ));
        }

        Ok(Self { page, limit })
    }

    pub fn from_params(params: &PageParams, config: &AppConfig) -> Result<Self, ApiError> {
        Self::resolve(params.page, params.limit, config)
    }

    /// Rows skipped before this page; bounded by [`PageRequest::resolve`].
    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.limit
    }
}

/// Pagination metadata returned with every page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaginationInfo {
    pub page: u64,
    pub limit: u64,
    /// Total matching rows
    pub total: u64,
    pub total_pages: u64,
    pub has_more: bool,
}

impl PaginationInfo {
    pub fn new(request: PageRequest, total: u64) -> Self {
        let total_pages = total.div_ceil(request.limit);
        Self {
            page: request.page,
            limit: request.limit,
            total,
            total_pages,
            has_more: request.page < total_pages,
        }
    }
}

/// One page of results
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: PaginationInfo,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            data,
            pagination: PaginationInfo::new(request, total),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn config() -> AppConfig {
        AppConfig::default()
    }

    #[test]
    fn defaults_apply_when_absent() {
        let request = PageRequest::resolve(None, None, &config()).unwrap();
        assert_eq!(request, PageRequest { page: 1, limit: 20 });
        assert_eq!(request.offset(), 0);
    }

    #[test]
    fn rejects_page_zero_and_out_of_range_limits() {
        let config = config();
        for (page, limit) in [(Some(0), None), (None, Some(0)), (None, Some(101))] {
            let err = PageRequest::resolve(page, limit, &config).unwrap_err();
            assert_eq!(err.status, StatusCode::BAD_REQUEST);
            assert_eq!(err.code, Box::from("VALIDATION_FAILED"));
        }
        assert!(PageRequest::resolve(Some(3), Some(100), &config).is_ok());
    }

    #[test]
    fn rejects_pages_whose_offset_overflows() {
        let config = config();
        let err = PageRequest::resolve(Some(u64::MAX), Some(20), &config).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, Box::from("VALIDATION_FAILED"));

        let last = i64::MAX as u64 / 20 + 1;
        let request = PageRequest::resolve(Some(last), Some(20), &config).unwrap();
        assert!(request.offset() <= i64::MAX as u64);
        assert!(PageRequest::resolve(Some(last + 1), Some(20), &config).is_err());
    }

    #[test]
    fn pagination_info_math() {
        let info = PaginationInfo::new(PageRequest { page: 2, limit: 10 }, 25);
        assert_eq!(info.total_pages, 3);
        assert!(info.has_more);

        let last = PaginationInfo::new(PageRequest { page: 3, limit: 10 }, 25);
        assert!(!last.has_more);

        let empty = PaginationInfo::new(PageRequest { page: 1, limit: 10 }, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_more);
    }

    #[test]
    fn search_term_is_trimmed_and_bounded() {
        let params = SearchParams {
            q: Some("  drill ".to_string()),
            ..Default::default()
        };
        assert_eq!(params.term().unwrap(), "drill");

        let blank = SearchParams {
            q: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(blank.term().is_err());

        let long = SearchParams {
            q: Some("x".repeat(MAX_SEARCH_LEN + 1)),
            ..Default::default()
        };
        assert!(long.term().is_err());
    }
}
