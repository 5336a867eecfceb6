//! Pagination strategy implementations

use super::types::{PageToken, Paginator};
use crate::types::{is_truthy, Context, JsonValue};

/// Default number of records requested per page
pub const DEFAULT_PAGE_SIZE: u32 = 100;

// ============================================================================
// Has-More Pagination
// ============================================================================

/// HubSpot v1 style pagination
///
/// Every request carries `count=<page_size>`. A response with a truthy
/// `has-more` continues from `offset`, or from `vid-offset` (sent back as
/// `vidOffset`) when `offset` is missing or empty. A false or absent
/// `has-more` ends pagination.
#[derive(Debug, Clone)]
pub struct HasMorePaginator {
    /// Records per page
    pub page_size: u32,
    /// Query parameter carrying the page size
    pub page_size_param: String,
}

impl Default for HasMorePaginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl HasMorePaginator {
    /// Create a paginator with the given page size
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size,
            page_size_param: "count".to_string(),
        }
    }

    /// Override the page size parameter name
    #[must_use]
    pub fn with_page_size_param(mut self, param: impl Into<String>) -> Self {
        self.page_size_param = param.into();
        self
    }
}

impl Paginator for HasMorePaginator {
    fn url_params(
        &self,
        _context: Option<&Context>,
        token: Option<&PageToken>,
    ) -> Vec<(String, String)> {
        let mut params = vec![(self.page_size_param.clone(), self.page_size.to_string())];
        if let Some(token) = token {
            params.extend(token.to_params());
        }
        params
    }

    fn next_page_token(
        &self,
        body: &JsonValue,
        _previous: Option<&PageToken>,
    ) -> Option<PageToken> {
        if !body.get("has-more").is_some_and(is_truthy) {
            return None;
        }

        if let Some(offset) = body.get("offset").filter(|v| is_truthy(v)) {
            return Some(PageToken::single("offset", offset.clone()));
        }

        body.get("vid-offset")
            .filter(|v| is_truthy(v))
            .map(|vid_offset| PageToken::single("vidOffset", vid_offset.clone()))
    }
}

// ============================================================================
// Single Page
// ============================================================================

/// Paginator for endpoints that return everything in one response
#[derive(Debug, Clone, Default)]
pub struct SinglePagePaginator;

impl Paginator for SinglePagePaginator {
    fn url_params(
        &self,
        _context: Option<&Context>,
        _token: Option<&PageToken>,
    ) -> Vec<(String, String)> {
        Vec::new()
    }

    fn next_page_token(
        &self,
        _body: &JsonValue,
        _previous: Option<&PageToken>,
    ) -> Option<PageToken> {
        None
    }
}
