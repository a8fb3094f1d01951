//! abn-lookup - cached client for an Australian business registry
//!
//! This crate searches an ABN registry over REST and keeps the answers in a
//! subscription-based request cache. Consumers subscribe to a request and
//! observe it move through `Idle → Loading → Success | Error`; identical
//! requests share one fetch, late responses never overwrite newer ones, and
//! entries are dropped by tag or after a retention window.
//!
//! # Search Example
//!
//! ```rust,no_run
//! use abn_lookup::{AbnLookup, AustralianState, SearchFilters, SearchState};
//!
//! #[tokio::main]
//! async fn main() -> abn_lookup::Result<()> {
//!     let lookup = AbnLookup::builder()
//!         .base_url("http://127.0.0.1:3000/api/v1")
//!         .build()?;
//!
//!     let state = SearchState::new()
//!         .with_query("bakery")
//!         .with_filters(SearchFilters::new().state(AustralianState::Nsw));
//!
//!     let mut results = lookup.search(&state);
//!     let settled = results.settled().await;
//!     if let Some(page) = settled.data.as_deref().and_then(|p| p.as_search()) {
//!         for business in &page.data {
//!             println!("{} {}", business.abn, business.display_name());
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Address Example
//!
//! ```rust
//! use abn_lookup::url_state;
//!
//! let state = url_state::decode("q=bakery&state=NSW&page=3");
//! assert_eq!(state.pagination.page(), 3);
//! assert_eq!(url_state::encode(&state), "q=bakery&state=NSW&page=3");
//! ```

pub mod cache;
pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod lookup;
pub mod telemetry;
pub mod traits;
pub mod types;
pub mod url_state;
pub mod view;

/// Package version.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-export main types at crate root
pub use cache::{CacheConfig, QueryState, QueryStatus, RequestCache, RequestKey, Subscription, Tag};
pub use config::Config;
pub use error::{LookupError, Result};
pub use lookup::{AbnLookup, AbnLookupBuilder, ApiPayload};
pub use traits::RegistryApi;

// Re-export all types
pub use types::{
    AbnStatus, ApiResponse, AustralianState, Business, BusinessDetailResponse, BusinessName,
    EntityType, FilterKey, PageRequest, PaginatedResponse, Pagination, SearchFilters, SearchMeta,
    SearchMode, SearchResponse, SearchState, Technique,
};
