//! Telemetry metric name constants.
//!
//! Centralised metric names for abn-lookup operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `abn_lookup_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `endpoint`: request endpoint (e.g. "/businesses/search")
//! - `status`: outcome: "ok" or "error"
//! - `reason`: eviction cause: "retention" or "invalidation"

/// Total requests issued by the request cache.
///
/// Labels: `endpoint`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "abn_lookup_requests_total";

/// Request duration in seconds.
///
/// Labels: `endpoint`.
pub const REQUEST_DURATION_SECONDS: &str = "abn_lookup_request_duration_seconds";

/// Subscriptions served from a fresh cached response.
///
/// Labels: `endpoint`.
pub const CACHE_HITS_TOTAL: &str = "abn_lookup_cache_hits_total";

/// Subscriptions that had to start or join a request.
///
/// Labels: `endpoint`.
pub const CACHE_MISSES_TOTAL: &str = "abn_lookup_cache_misses_total";

/// Entries removed from the cache.
///
/// Labels: `reason` ("retention" | "invalidation").
pub const CACHE_EVICTIONS_TOTAL: &str = "abn_lookup_cache_evictions_total";

/// Responses dropped because a newer request for the same key superseded them.
///
/// Labels: `endpoint`.
pub const STALE_RESPONSES_TOTAL: &str = "abn_lookup_stale_responses_total";
