//! Core RegistryApi trait

use async_trait::async_trait;

use crate::{BusinessDetailResponse, Result, SearchResponse, SearchState};

/// Endpoint of `GET /businesses/search`.
pub const SEARCH_ENDPOINT: &str = "/businesses/search";

/// Endpoint of `GET /businesses/{abn}`.
pub fn business_endpoint(abn: &str) -> String {
    format!("/businesses/{abn}")
}

/// Remote business registry.
///
/// [`HttpRegistryClient`](crate::client::HttpRegistryClient) talks to the
/// real REST API; tests substitute in-memory implementations.
#[async_trait]
pub trait RegistryApi: Send + Sync {
    /// One page of businesses matching `state`.
    async fn search(&self, state: &SearchState) -> Result<SearchResponse>;

    /// A single business by its (normalized) ABN.
    ///
    /// Returns `NotFound` when the registry has no such ABN.
    async fn business(&self, abn: &str) -> Result<BusinessDetailResponse>;
}
