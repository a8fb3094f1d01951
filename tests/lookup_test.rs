//! Tests for the [`AbnLookup`] facade: tagging, invalidation in lockstep,
//! and how outcomes surface in the results view.

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use abn_lookup::cache::{ManualClock, Tag};
use abn_lookup::lookup::{AI_PREVIEW_LIMIT, SEARCH_TAG};
use abn_lookup::view::{ResultsDisplay, ResultsView};
use abn_lookup::{
    AbnLookup, AbnLookupBuilder, ApiPayload, ApiResponse, Business, BusinessDetailResponse, Config,
    LookupError, PaginatedResponse, Pagination, RegistryApi, Result, SearchMode, SearchResponse,
    SearchState, url_state,
};

// ============================================================================
// In-memory registry
// ============================================================================

fn business(abn: &str, name: &str) -> Business {
    serde_json::from_value(json!({
        "abn": abn,
        "abnStatus": "ACT",
        "entityTypeCode": "PRV",
        "entityTypeText": "Australian Private Company",
        "entityName": name,
        "state": "VIC"
    }))
    .unwrap()
}

fn page_of(rows: Vec<Business>, total: u64) -> SearchResponse {
    PaginatedResponse {
        status: "success".to_string(),
        data: rows,
        pagination: Pagination {
            page: 1,
            limit: 20,
            total,
            total_pages: 1,
        },
        meta: None,
    }
}

#[derive(Default)]
struct FakeRegistry {
    search_calls: AtomicUsize,
    business_calls: AtomicUsize,
    last_search: Mutex<Option<SearchState>>,
    results: Mutex<Vec<Business>>,
    fail_search: bool,
}

impl FakeRegistry {
    fn with_results(rows: Vec<Business>) -> Self {
        Self {
            results: Mutex::new(rows),
            ..Self::default()
        }
    }

    fn searches(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    fn lookups(&self) -> usize {
        self.business_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegistryApi for FakeRegistry {
    async fn search(&self, state: &SearchState) -> Result<SearchResponse> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_search.lock().unwrap() = Some(state.clone());
        if self.fail_search {
            return Err(LookupError::Network("connection refused".into()));
        }
        let rows = self.results.lock().unwrap().clone();
        let total = rows.len() as u64;
        Ok(page_of(rows, total))
    }

    async fn business(&self, abn: &str) -> Result<BusinessDetailResponse> {
        self.business_calls.fetch_add(1, Ordering::SeqCst);
        let found = self
            .results
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.abn == abn)
            .cloned();
        match found {
            Some(data) => Ok(ApiResponse {
                status: "success".to_string(),
                data,
            }),
            None => Err(LookupError::NotFound(abn.to_string())),
        }
    }
}

fn lookup_with(api: Arc<FakeRegistry>) -> AbnLookup {
    AbnLookup::builder()
        .api(api)
        .clock(Arc::new(ManualClock::new()))
        .build()
        .unwrap()
}

// ============================================================================
// Search
// ============================================================================

#[tokio::test]
async fn identical_searches_share_one_request() {
    let api = Arc::new(FakeRegistry::with_results(vec![business("51824753556", "A")]));
    let lookup = lookup_with(api.clone());
    let state = url_state::decode("q=bakery&state=NSW&page=3");

    let mut first = lookup.search(&state);
    let mut second = lookup.search(&url_state::decode("page=3&state=NSW&q=bakery"));
    first.settled().await;
    second.settled().await;

    assert_eq!(api.searches(), 1);
    let sent = api.last_search.lock().unwrap().clone().unwrap();
    assert_eq!(sent, state);
}

#[tokio::test]
async fn empty_results_are_displayed_as_empty_not_error() {
    let api = Arc::new(FakeRegistry::default());
    let lookup = lookup_with(api);

    let mut sub = lookup.search(&SearchState::new().with_query("zzzz"));
    let mut view: ResultsView<ApiPayload> = ResultsView::new();
    view.apply(&sub.state());
    assert_eq!(view.display(), ResultsDisplay::Loading);

    view.apply(&sub.settled().await);
    assert_eq!(view.display(), ResultsDisplay::Empty);
    assert!(view.error().is_none());
}

#[tokio::test]
async fn failed_search_offers_retry() {
    let api = Arc::new(FakeRegistry {
        fail_search: true,
        ..FakeRegistry::default()
    });
    let lookup = lookup_with(api.clone());
    let state = SearchState::new().with_query("cafe");

    let mut sub = lookup.search(&state);
    let mut view: ResultsView<ApiPayload> = ResultsView::new();
    view.apply(&sub.settled().await);
    assert!(matches!(
        view.display(),
        ResultsDisplay::Failed {
            retryable: true,
            ..
        }
    ));

    assert!(lookup.retry_search(&state));
    sub.settled().await;
    assert_eq!(api.searches(), 2);
}

#[tokio::test]
async fn parameter_change_keeps_previous_results_while_loading() {
    let api = Arc::new(FakeRegistry::with_results(vec![business("51824753556", "A")]));
    let lookup = lookup_with(api);
    let mut state = SearchState::new().with_query("a");

    let mut first = lookup.search(&state);
    let mut view: ResultsView<ApiPayload> = ResultsView::new();
    view.apply(&first.settled().await);
    assert_eq!(view.display(), ResultsDisplay::Results { rows: 1 });

    state.set_page(2);
    let second = lookup.search(&state);
    assert!(view.params_changed());
    assert_eq!(view.display(), ResultsDisplay::Refreshing);
    drop(second);
}

// ============================================================================
// Business detail
// ============================================================================

#[tokio::test]
async fn malformed_abn_is_rejected_without_request() {
    let api = Arc::new(FakeRegistry::default());
    let lookup = lookup_with(api.clone());

    let err = lookup.business("12 345").unwrap_err();
    assert!(matches!(err, LookupError::InvalidInput(_)));
    assert_eq!(api.lookups(), 0);
    assert!(lookup.cache().is_empty());
}

#[tokio::test]
async fn abn_with_spaces_is_normalized() {
    let api = Arc::new(FakeRegistry::with_results(vec![business("51824753556", "A")]));
    let lookup = lookup_with(api.clone());

    let detail = lookup.business_once("51 824 753 556").await.unwrap();
    assert_eq!(detail.data.abn, "51824753556");
    let _again = lookup.business("51824753556").unwrap();
    assert_eq!(api.lookups(), 1);
}

#[tokio::test]
async fn unknown_abn_is_displayed_as_not_found() {
    let api = Arc::new(FakeRegistry::default());
    let lookup = lookup_with(api);

    let mut sub = lookup.business("11111111111").unwrap();
    let mut view: ResultsView<ApiPayload> = ResultsView::new();
    view.apply(&sub.settled().await);
    assert_eq!(view.display(), ResultsDisplay::NotFound);
}

// ============================================================================
// Invalidation
// ============================================================================

#[tokio::test]
async fn invalidating_search_drops_details_in_lockstep() {
    let api = Arc::new(FakeRegistry::with_results(vec![business("51824753556", "A")]));
    let lookup = lookup_with(api.clone());

    let mut results = lookup.search(&SearchState::new().with_query("a"));
    results.settled().await;
    let mut detail = lookup.business("51824753556").unwrap();
    detail.settled().await;
    drop((results, detail));

    let outcome = lookup.invalidate_search_results();
    assert_eq!(outcome.evicted.len(), 2);
    assert!(lookup.cache().is_empty());

    let mut detail = lookup.business("51824753556").unwrap();
    detail.settled().await;
    assert_eq!(api.lookups(), 2);
}

#[tokio::test]
async fn invalidating_one_business_keeps_search_results() {
    let api = Arc::new(FakeRegistry::with_results(vec![
        business("51824753556", "A"),
        business("11111111111", "B"),
    ]));
    let lookup = lookup_with(api.clone());

    let mut results = lookup.search(&SearchState::new());
    results.settled().await;
    let mut a = lookup.business("51824753556").unwrap();
    let mut b = lookup.business("11111111111").unwrap();
    a.settled().await;
    b.settled().await;
    drop((results, a, b));

    let outcome = lookup.invalidate_business("51824753556").unwrap();
    assert_eq!(outcome.evicted.len(), 1);
    assert_eq!(lookup.cache().len(), 2);

    let _results = lookup.search(&SearchState::new());
    assert_eq!(api.searches(), 1);
}

#[tokio::test]
async fn ai_search_is_untagged() {
    let api = Arc::new(FakeRegistry::with_results(vec![business("51824753556", "A")]));
    let lookup = lookup_with(api.clone());

    let response = lookup.ai_search_once("bakeries in Melbourne").await.unwrap();
    assert_eq!(response.data.len(), 1);
    let sent = api.last_search.lock().unwrap().clone().unwrap();
    assert_eq!(sent.mode, SearchMode::Ai);
    assert_eq!(sent.pagination.limit(), AI_PREVIEW_LIMIT);

    let outcome = lookup.invalidate(&Tag::kind(SEARCH_TAG));
    assert!(outcome.is_empty());
    assert_eq!(lookup.cache().len(), 1);
}

// ============================================================================
// Retention
// ============================================================================

#[tokio::test(start_paused = true)]
async fn configured_sweeper_evicts_expired_entries() {
    let config = Config::from_toml_str(
        r#"
        [cache]
        retention_secs = 5
        sweep_interval_secs = 1
        "#,
    )
    .unwrap();
    let clock = Arc::new(ManualClock::new());
    let api = Arc::new(FakeRegistry::with_results(vec![business("51824753556", "A")]));
    let lookup = AbnLookupBuilder::from_config(&config)
        .api(api)
        .clock(clock.clone())
        .build()
        .unwrap();

    let mut sub = lookup.search(&url_state::decode("q=bakery"));
    sub.settled().await;
    drop(sub);
    assert_eq!(lookup.cache().len(), 1);

    clock.advance(Duration::from_secs(6));
    tokio::time::sleep(Duration::from_secs(2)).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(lookup.cache().is_empty());
}

// ============================================================================
// End to end over HTTP
// ============================================================================

#[tokio::test]
async fn search_once_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/businesses/search"))
        .and(query_param("q", "bakery"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": [],
            "pagination": { "page": 3, "limit": 20, "total": 0, "totalPages": 0 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let lookup = AbnLookup::builder()
        .base_url(format!("{}/api/v1", server.uri()))
        .build()
        .unwrap();
    let state = url_state::decode("?q=bakery&state=NSW&page=3");
    let first = lookup.search_once(&state).await.unwrap();
    let second = lookup.search_once(&state).await.unwrap();
    assert!(first.is_empty());
    assert_eq!(first, second);
}
