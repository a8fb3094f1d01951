//! [`HttpRegistryClient`]: [`RegistryApi`] over the registry's REST API.
//!
//! Error mapping:
//! - the request never completed → `Network`
//! - `404` on a detail lookup → `NotFound`
//! - any other non-success status → `Response` (with the body's `message`
//!   when the API sends one)
//! - an unparseable body → `Decode`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::traits::{SEARCH_ENDPOINT, business_endpoint};
use crate::{
    BusinessDetailResponse, LookupError, RegistryApi, Result, SearchResponse, SearchState,
};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000/api/v1";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the registry REST API.
#[derive(Clone, Debug)]
pub struct HttpRegistryClient {
    http: Client,
    base_url: Url,
}

impl HttpRegistryClient {
    /// Create a client for the default base URL.
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (e.g. a wiremock server).
    pub fn with_base_url(base_url: impl AsRef<str>) -> Result<Self> {
        Self::with_options(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom base URL and request timeout.
    pub fn with_options(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self> {
        let base_url = parse_base_url(base_url.as_ref())?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LookupError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}{endpoint}`, keeping any path prefix of the base URL.
    fn url(&self, endpoint: &str) -> Result<Url> {
        let joined = format!(
            "{}{}",
            self.base_url.as_str().trim_end_matches('/'),
            endpoint
        );
        Url::parse(&joined)
            .map_err(|e| LookupError::InvalidInput(format!("invalid request URL {joined}: {e}")))
    }
}

/// Validate a base URL: absolute, http or https.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| LookupError::Configuration(format!("invalid API base URL '{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(LookupError::Configuration(format!(
            "API base URL must be http or https, got '{other}'"
        ))),
    }
}

/// Error body the API sends alongside non-success statuses.
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Turn a non-success response into a `Response` error.
async fn response_error(response: Response) -> LookupError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
    LookupError::Response {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl RegistryApi for HttpRegistryClient {
    async fn search(&self, state: &SearchState) -> Result<SearchResponse> {
        let url = self.url(SEARCH_ENDPOINT)?;
        debug!(url = %url, query = %state.query(), "searching registry");

        let response = self
            .http
            .get(url)
            .query(&state.api_params())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(response_error(response).await);
        }
        Ok(response.json().await?)
    }

    async fn business(&self, abn: &str) -> Result<BusinessDetailResponse> {
        let url = self.url(&business_endpoint(abn))?;
        debug!(url = %url, "fetching business");

        let response = self.http.get(url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound(abn.to_string()));
        }
        if !response.status().is_success() {
            return Err(response_error(response).await);
        }
        Ok(response.json().await?)
    }
}
