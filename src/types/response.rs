//! API response envelopes.
//!
//! Every list endpoint returns a [`PaginatedResponse`], every single-item
//! endpoint an [`ApiResponse`].

use serde::{Deserialize, Serialize};

use super::business::Business;

/// Page position of a list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

/// Timing information a search may report.
///
/// Only the two timings are interpreted; anything else the backend adds is
/// kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_time_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time_ms: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    #[serde(default = "success")]
    pub status: String,
    pub data: Vec<T>,
    pub pagination: Pagination,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<SearchMeta>,
}

impl<T> PaginatedResponse<T> {
    /// Whether this page holds no rows.
    ///
    /// An empty page is a successful answer, not an error.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A single item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default = "success")]
    pub status: String,
    pub data: T,
}

fn success() -> String {
    "success".to_string()
}

/// Response of `GET /businesses/search`.
pub type SearchResponse = PaginatedResponse<Business>;

/// Response of `GET /businesses/{abn}`.
pub type BusinessDetailResponse = ApiResponse<Business>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_response_keeps_unknown_meta() {
        let json = serde_json::json!({
            "status": "success",
            "data": [],
            "pagination": { "page": 1, "limit": 20, "total": 0, "totalPages": 0 },
            "meta": { "queryTimeMs": 12.5, "totalTimeMs": 20, "index": "gin_trgm" }
        });
        let response: SearchResponse = serde_json::from_value(json).unwrap();
        assert!(response.is_empty());
        let meta = response.meta.unwrap();
        assert_eq!(meta.query_time_ms, Some(12.5));
        assert_eq!(meta.total_time_ms, Some(20.0));
        assert_eq!(meta.extra["index"], "gin_trgm");
    }

    #[test]
    fn missing_meta_and_status_default() {
        let json = serde_json::json!({
            "data": [],
            "pagination": { "page": 2, "limit": 5, "total": 7, "totalPages": 2 }
        });
        let response: SearchResponse = serde_json::from_value(json).unwrap();
        assert_eq!(response.status, "success");
        assert!(response.meta.is_none());
        assert_eq!(response.pagination.total_pages, 2);
    }
}
