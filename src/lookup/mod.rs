//! [`AbnLookup`] - the registry client wired into the request cache.
//!
//! Every request goes through one [`RequestCache`] so entries of different
//! endpoints can share tags:
//!
//! | request                  | tags                              |
//! |--------------------------|-----------------------------------|
//! | search                   | `Search`                          |
//! | business detail          | `Business:{abn}`, `Search`        |
//! | AI search (chat preview) | none                              |
//!
//! Invalidating `Search` therefore drops every result page together with
//! every business detail, while `Business:{abn}` drops only that detail.

mod builder;

pub use builder::AbnLookupBuilder;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::cache::{Invalidation, RequestCache, RequestKey, Subscription, Tag};
use crate::traits::business_endpoint;
use crate::types::{SearchMode, normalize_abn};
use crate::{
    BusinessDetailResponse, LookupError, RegistryApi, Result, SearchResponse, SearchState,
};

/// Tag kind shared by search results and business details.
pub const SEARCH_TAG: &str = "Search";

/// Tag kind of single-business entries (`Business:{abn}`).
pub const BUSINESS_TAG: &str = "Business";

/// Page size of an AI search preview.
pub const AI_PREVIEW_LIMIT: u32 = 5;

/// Payload of a cache entry: whatever the endpoint returned.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiPayload {
    Search(SearchResponse),
    Business(BusinessDetailResponse),
}

impl ApiPayload {
    pub fn as_search(&self) -> Option<&SearchResponse> {
        match self {
            Self::Search(response) => Some(response),
            Self::Business(_) => None,
        }
    }

    pub fn as_business(&self) -> Option<&BusinessDetailResponse> {
        match self {
            Self::Business(response) => Some(response),
            Self::Search(_) => None,
        }
    }
}

/// Subscription to a registry request.
pub type LookupSubscription = Subscription<ApiPayload>;

/// Main entry point: cached, subscribable access to the registry.
///
/// ```rust,no_run
/// use abn_lookup::{AbnLookup, SearchState};
///
/// #[tokio::main]
/// async fn main() -> abn_lookup::Result<()> {
///     let lookup = AbnLookup::builder()
///         .base_url("http://127.0.0.1:3000/api/v1")
///         .build()?;
///
///     let results = lookup.search_once(&SearchState::new().with_query("bakery")).await?;
///     println!("{} businesses", results.pagination.total);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct AbnLookup {
    api: Arc<dyn RegistryApi>,
    cache: RequestCache<ApiPayload>,
}

impl AbnLookup {
    /// Create a new builder for configuring the lookup.
    pub fn builder() -> AbnLookupBuilder {
        AbnLookupBuilder::new()
    }

    pub(crate) fn new(api: Arc<dyn RegistryApi>, cache: RequestCache<ApiPayload>) -> Self {
        Self { api, cache }
    }

    /// The underlying request cache.
    pub fn cache(&self) -> &RequestCache<ApiPayload> {
        &self.cache
    }

    /// Subscribe to one page of search results.
    pub fn search(&self, state: &SearchState) -> LookupSubscription {
        let api = Arc::clone(&self.api);
        let state = state.clone();
        self.cache
            .subscribe(state.request_key(), [Tag::kind(SEARCH_TAG)], move || {
                async move { api.search(&state).await.map(ApiPayload::Search) }
            })
    }

    /// Subscribe to the details of one business.
    ///
    /// The ABN is normalized first; a malformed one fails with
    /// `InvalidInput` before anything is cached or requested.
    pub fn business(&self, abn: &str) -> Result<LookupSubscription> {
        let abn = normalize_abn(abn)?;
        let key = RequestKey::new(business_endpoint(&abn));
        let tags = [Tag::item(BUSINESS_TAG, abn.clone()), Tag::kind(SEARCH_TAG)];
        let api = Arc::clone(&self.api);
        Ok(self.cache.subscribe(key, tags, move || async move {
            api.business(&abn).await.map(ApiPayload::Business)
        }))
    }

    /// Subscribe to an AI search preview for free text.
    pub fn ai_search(&self, text: &str) -> LookupSubscription {
        let state = ai_search_state(text);
        let api = Arc::clone(&self.api);
        self.cache.subscribe(state.request_key(), [], move || async move {
            api.search(&state).await.map(ApiPayload::Search)
        })
    }

    /// Explicit retry of a search. Returns `false` if it is not cached.
    pub fn retry_search(&self, state: &SearchState) -> bool {
        let api = Arc::clone(&self.api);
        let state = state.clone();
        self.cache.refetch(&state.request_key(), move || async move {
            api.search(&state).await.map(ApiPayload::Search)
        })
    }

    /// Explicit retry of a business lookup. Returns `Ok(false)` if it is
    /// not cached.
    pub fn retry_business(&self, abn: &str) -> Result<bool> {
        let abn = normalize_abn(abn)?;
        let key = RequestKey::new(business_endpoint(&abn));
        let api = Arc::clone(&self.api);
        Ok(self.cache.refetch(&key, move || async move {
            api.business(&abn).await.map(ApiPayload::Business)
        }))
    }

    /// Invalidate every entry carrying `tag`.
    pub fn invalidate(&self, tag: &Tag) -> Invalidation {
        self.cache.invalidate(tag)
    }

    /// Invalidate all search results and business details.
    pub fn invalidate_search_results(&self) -> Invalidation {
        self.invalidate(&Tag::kind(SEARCH_TAG))
    }

    /// Invalidate the details of one business.
    pub fn invalidate_business(&self, abn: &str) -> Result<Invalidation> {
        let abn = normalize_abn(abn)?;
        Ok(self.invalidate(&Tag::item(BUSINESS_TAG, abn)))
    }

    /// Periodically evict expired entries; see [`RequestCache::spawn_sweeper`].
    pub fn spawn_sweeper(&self, period: Duration) -> JoinHandle<()> {
        self.cache.spawn_sweeper(period)
    }

    /// Search and wait for the outcome.
    pub async fn search_once(&self, state: &SearchState) -> Result<SearchResponse> {
        let mut subscription = self.search(state);
        let payload = settle(&mut subscription).await?;
        payload
            .as_search()
            .cloned()
            .ok_or_else(|| unexpected_payload(subscription.key()))
    }

    /// Look up one business and wait for the outcome.
    pub async fn business_once(&self, abn: &str) -> Result<BusinessDetailResponse> {
        let mut subscription = self.business(abn)?;
        let payload = settle(&mut subscription).await?;
        payload
            .as_business()
            .cloned()
            .ok_or_else(|| unexpected_payload(subscription.key()))
    }

    /// AI search and wait for the outcome.
    pub async fn ai_search_once(&self, text: &str) -> Result<SearchResponse> {
        let mut subscription = self.ai_search(text);
        let payload = settle(&mut subscription).await?;
        payload
            .as_search()
            .cloned()
            .ok_or_else(|| unexpected_payload(subscription.key()))
    }
}

/// Search state of an AI preview request.
pub fn ai_search_state(text: &str) -> SearchState {
    SearchState::new()
        .with_query(text)
        .with_limit(AI_PREVIEW_LIMIT)
        .with_mode(SearchMode::Ai)
}

async fn settle(subscription: &mut LookupSubscription) -> Result<Arc<ApiPayload>> {
    let state = subscription.settled().await;
    if let Some(error) = state.error {
        return Err(error);
    }
    state
        .data
        .ok_or_else(|| LookupError::Network(format!("no response for {}", subscription.key())))
}

fn unexpected_payload(key: &RequestKey) -> LookupError {
    LookupError::Decode(format!("unexpected payload cached for {key}"))
}
