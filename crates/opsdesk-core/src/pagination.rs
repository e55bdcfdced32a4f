//! Page arithmetic for list endpoints.

use serde::Serialize;

use crate::config::PaginationConfig;

/// A normalized page request: `page >= 1`, `1 <= limit <= max_limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// One-based page number.
    pub page: u64,
    /// Page size.
    pub limit: u64,
}

impl PageRequest {
    /// Normalize raw query parameters.
    ///
    /// Missing or zero values fall back to page 1 and the configured
    /// default limit; oversized limits are clamped to the maximum.
    pub fn new(page: Option<u64>, limit: Option<u64>, config: &PaginationConfig) -> Self {
        let page = page.filter(|p| *p > 0).unwrap_or(1);
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(config.default_limit)
            .clamp(1, config.max_limit.max(1));
        Self { page, limit }
    }

    /// Number of documents to skip.
    pub const fn skip(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    /// Page metadata for a result set of `total` documents.
    pub const fn pagination(&self, total: u64) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
            total_pages: total.div_ceil(self.limit),
        }
    }
}

/// Page metadata returned in list envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Current page.
    pub page: u64,
    /// Page size.
    pub limit: u64,
    /// `ceil(total / limit)`; zero for an empty result.
    pub total_pages: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PaginationConfig {
        PaginationConfig::default()
    }

    #[test]
    fn defaults_apply() {
        let req = PageRequest::new(None, None, &config());
        assert_eq!(req, PageRequest { page: 1, limit: 10 });
        assert_eq!(req.skip(), 0);
    }

    #[test]
    fn second_page_of_fifteen() {
        let req = PageRequest::new(Some(2), Some(5), &config());
        assert_eq!(req.skip(), 5);
        let pagination = req.pagination(15);
        assert_eq!(pagination.total_pages, 3);
        assert_eq!(pagination.page, 2);
        assert_eq!(pagination.limit, 5);
    }

    #[test]
    fn limits_are_clamped() {
        let req = PageRequest::new(Some(0), Some(10_000), &config());
        assert_eq!(req, PageRequest { page: 1, limit: 100 });
        let req = PageRequest::new(Some(3), Some(0), &config());
        assert_eq!(req.limit, 10);
    }

    #[test]
    fn total_pages_rounds_up_and_handles_empty() {
        let req = PageRequest::new(Some(1), Some(5), &config());
        assert_eq!(req.pagination(0).total_pages, 0);
        assert_eq!(req.pagination(5).total_pages, 1);
        assert_eq!(req.pagination(6).total_pages, 2);
    }

    #[test]
    fn huge_page_does_not_overflow() {
        let req = PageRequest::new(Some(u64::MAX), Some(100), &config());
        assert_eq!(req.skip(), u64::MAX);
    }

    #[test]
    fn serializes_camel_case() {
        let pagination = PageRequest::new(Some(2), Some(5), &config()).pagination(15);
        let json = serde_json::to_value(pagination);
        assert_eq!(
            json.ok(),
            Some(serde_json::json!({"page": 2, "limit": 5, "totalPages": 3}))
        );
    }
}
