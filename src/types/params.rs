//! Search parameters and their state transitions.

use serde::{Deserialize, Deserializer, Serialize};

use super::filters::{DEFAULT_PAGE_SIZE, FilterKey, MAX_PAGE_SIZE, SearchFilters, SearchMode};
use crate::cache::RequestKey;
use crate::traits::SEARCH_ENDPOINT;

/// Page position of a request.
///
/// `page` is always ≥ 1 and `limit` always within `1..=MAX_PAGE_SIZE`; the
/// constructors clamp rather than fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Build a page request, clamping both values into range.
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Whether `limit` is an acceptable page size.
    pub fn is_valid_limit(limit: u32) -> bool {
        (1..=MAX_PAGE_SIZE).contains(&limit)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}

/// Everything that identifies one search: query text, filters, page and mode.
///
/// This is the typed form of the results page address (see
/// [`url_state`](crate::url_state)) and the argument of the search endpoint.
/// The transition methods keep the page consistent: changing what is being
/// searched for always goes back to page 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchState {
    /// Free-text query, always trimmed; empty means "no query".
    #[serde(deserialize_with = "deserialize_trimmed")]
    pub(crate) query: String,
    pub filters: SearchFilters,
    pub pagination: PageRequest,
    pub mode: SearchMode,
}

fn deserialize_trimmed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let s = String::deserialize(deserializer)?;
    Ok(s.trim().to_string())
}

impl SearchState {
    /// Default state: no query, no filters, page 1 of 20, standard mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// The trimmed query text; empty when no query is set.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Builder-style query setter (trims, does not touch the page).
    pub fn with_query(mut self, query: impl AsRef<str>) -> Self {
        self.query = query.as_ref().trim().to_string();
        self
    }

    /// Builder-style filters setter.
    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Builder-style page setter.
    pub fn with_page(mut self, page: u32) -> Self {
        self.pagination = PageRequest::new(page, self.pagination.limit);
        self
    }

    /// Builder-style page size setter.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.pagination = PageRequest::new(self.pagination.page, limit);
        self
    }

    /// Builder-style mode setter.
    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Replace the query text and go back to page 1.
    pub fn set_query(&mut self, query: &str) {
        self.query = query.trim().to_string();
        self.reset_page();
    }

    /// Set one filter from its code and go back to page 1.
    ///
    /// Empty or unknown values clear the filter.
    pub fn set_filter(&mut self, key: FilterKey, value: &str) {
        self.filters.set(key, value);
        self.reset_page();
    }

    /// Drop every filter and go back to page 1.
    pub fn clear_filters(&mut self) {
        self.filters = SearchFilters::default();
        self.reset_page();
    }

    /// Move to `page` (values below 1 mean page 1).
    pub fn set_page(&mut self, page: u32) {
        self.pagination = PageRequest::new(page, self.pagination.limit);
    }

    /// Change the page size and go back to page 1.
    pub fn set_limit(&mut self, limit: u32) {
        self.pagination = PageRequest::new(1, limit);
    }

    /// Switch between the standard and AI search surfaces.
    pub fn set_mode(&mut self, mode: SearchMode) {
        self.mode = mode;
    }

    fn reset_page(&mut self) {
        self.pagination = PageRequest::new(1, self.pagination.limit);
    }

    /// Query parameters for `GET /businesses/search`.
    ///
    /// Unset filters and an empty query are omitted; page, limit, mode and
    /// technique are always sent.
    pub fn api_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(8);
        if !self.query.is_empty() {
            params.push(("q", self.query.clone()));
        }
        if let Some(state) = self.filters.state {
            params.push(("state", state.code().to_string()));
        }
        if let Some(entity_type) = self.filters.entity_type {
            params.push(("entityType", entity_type.code().to_string()));
        }
        if let Some(status) = self.filters.abn_status {
            params.push(("abnStatus", status.code().to_string()));
        }
        params.push(("page", self.pagination.page().to_string()));
        params.push(("limit", self.pagination.limit().to_string()));
        params.push(("mode", self.mode.code().to_string()));
        params.push(("technique", self.filters.technique.code().to_string()));
        params
    }

    /// Cache key of the search request for this state.
    pub fn request_key(&self) -> RequestKey {
        RequestKey::with_params(SEARCH_ENDPOINT, self.api_params())
    }

    /// Title for a results page showing this search.
    pub fn page_title(&self) -> String {
        if self.query.is_empty() {
            "All Businesses".to_string()
        } else {
            format!("Results for \"{}\"", self.query)
        }
    }
}
