//! Subscription-based request cache.
//!
//! [`RequestCache`] holds one entry per [`RequestKey`]. Consumers register
//! interest with [`RequestCache::subscribe`] and get back a [`Subscription`]
//! that observes the entry's state as it moves through
//! `Idle → Loading → Success | Error`.
//!
//! # Fetching
//!
//! - A fresh `Success` entry is served without calling the request function.
//! - While a request for a key is in flight, new subscribers join it; at most
//!   one fetch per key runs from `subscribe`. A request that was in flight
//!   when its entry was invalidated is not joined: the next subscriber starts
//!   a replacement that supersedes it.
//! - [`RequestCache::refetch`] always starts a new request. Every request gets
//!   an increasing id and only the latest id for a key may commit, so an
//!   older response that lands late is dropped.
//! - Failures are stored as `Error` and never retried automatically.
//!
//! # Retention
//!
//! Entries with subscribers never expire. When the last subscriber leaves,
//! the retention countdown starts; once it runs out the entry is evicted the
//! next time it is touched, on [`RequestCache::sweep`], or by the task from
//! [`RequestCache::spawn_sweeper`]. Tag invalidation marks entries stale and
//! evicts the unsubscribed ones straight away.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, warn};

use super::clock::{Clock, SystemClock};
use super::key::RequestKey;
use super::tags::{Tag, TagIndex};
use crate::telemetry;
use crate::{LookupError, Result};

/// Configuration for the request cache.
///
/// ```rust
/// # use abn_lookup::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new().retention(Duration::from_secs(30));
/// assert_eq!(config.retention, Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long an unused entry survives after its last subscriber leaves.
    /// Default: 120 seconds.
    pub retention: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            retention: Duration::from_secs(120),
        }
    }
}

impl CacheConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the retention window.
    pub fn retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }
}

/// Lifecycle position of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryStatus {
    Idle,
    Loading,
    Success,
    Error,
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Success => "success",
            Self::Error => "error",
        })
    }
}

/// What a subscriber sees: `{data, status, error}` plus fetch flags.
///
/// `data` survives a refetch, so a view can keep showing the previous
/// payload while `is_fetching` is set.
#[derive(Debug)]
pub struct QueryState<T> {
    pub status: QueryStatus,
    pub data: Option<Arc<T>>,
    pub error: Option<LookupError>,
    /// A request for this key is in flight.
    pub is_fetching: bool,
    /// The entry was invalidated and will be refetched on next subscribe.
    pub stale: bool,
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            is_fetching: self.is_fetching,
            stale: self.stale,
        }
    }
}

impl<T> QueryState<T> {
    fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            is_fetching: false,
            stale: false,
        }
    }

    /// Loading with nothing to show yet.
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading && self.data.is_none()
    }

    /// Loading while a previous payload is still available.
    pub fn is_refreshing(&self) -> bool {
        self.is_fetching && self.data.is_some()
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }
}

/// Point-in-time copy of one cache entry, as returned by [`RequestCache::get`].
#[derive(Debug)]
pub struct CacheEntry<T> {
    pub key: RequestKey,
    pub status: QueryStatus,
    pub data: Option<Arc<T>>,
    pub error: Option<LookupError>,
    pub inserted_at: Instant,
    pub last_accessed_at: Instant,
    /// When the last successful response was stored.
    pub fulfilled_at: Option<Instant>,
    pub subscriber_count: usize,
    pub stale: bool,
    pub tags: Vec<Tag>,
}

/// Outcome of [`RequestCache::invalidate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invalidation {
    /// Entries removed because nobody was subscribed.
    pub evicted: Vec<RequestKey>,
    /// Subscribed entries that will refetch on next subscribe.
    pub marked_stale: Vec<RequestKey>,
}

impl Invalidation {
    /// Total number of entries the invalidation reached.
    pub fn len(&self) -> usize {
        self.evicted.len() + self.marked_stale.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct Slot<T> {
    status: QueryStatus,
    data: Option<Arc<T>>,
    error: Option<LookupError>,
    inserted_at: Instant,
    last_accessed_at: Instant,
    fulfilled_at: Option<Instant>,
    subscriber_count: usize,
    stale: bool,
    /// Id of the most recently started request; only it may commit.
    latest_request: u64,
    in_flight: bool,
    tx: watch::Sender<QueryState<T>>,
}

impl<T> Slot<T> {
    fn new(now: Instant) -> Self {
        let (tx, _) = watch::channel(QueryState::idle());
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            inserted_at: now,
            last_accessed_at: now,
            fulfilled_at: None,
            subscriber_count: 0,
            stale: false,
            latest_request: 0,
            in_flight: false,
            tx,
        }
    }

    fn is_fresh(&self) -> bool {
        self.status == QueryStatus::Success && !self.stale
    }

    fn is_expired(&self, now: Instant, retention: Duration) -> bool {
        !self.in_flight
            && self.subscriber_count == 0
            && now.saturating_duration_since(self.last_accessed_at) > retention
    }

    fn state(&self) -> QueryState<T> {
        QueryState {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            is_fetching: self.in_flight,
            stale: self.stale,
        }
    }

    /// Push the current state to every subscriber.
    fn publish(&self) {
        self.tx.send_replace(self.state());
    }

    fn begin_request(&mut self, id: u64) {
        self.latest_request = id;
        self.in_flight = true;
        self.stale = false;
        self.status = QueryStatus::Loading;
        self.error = None;
        self.publish();
    }
}

struct Inner<T> {
    entries: HashMap<RequestKey, Slot<T>>,
    tags: TagIndex,
    next_request: u64,
}

impl<T> Inner<T> {
    fn next_request_id(&mut self) -> u64 {
        self.next_request += 1;
        self.next_request
    }

    fn remove(&mut self, key: &RequestKey, reason: &'static str) {
        if self.entries.remove(key).is_some() {
            self.tags.remove_key(key);
            debug!(key = %key, reason, "cache entry evicted");
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL, "reason" => reason).increment(1);
        }
    }

    fn evict_if_expired(&mut self, key: &RequestKey, now: Instant, retention: Duration) {
        if self
            .entries
            .get(key)
            .is_some_and(|slot| slot.is_expired(now, retention))
        {
            self.remove(key, "retention");
        }
    }
}

struct Shared<T> {
    inner: Mutex<Inner<T>>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-memory request cache with subscriptions, tags and retention.
///
/// Cloning is cheap and yields a handle to the same cache. Requests are
/// spawned on the ambient tokio runtime, so `subscribe` and `refetch` must be
/// called from within one. No lock is held across an await.
pub struct RequestCache<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for RequestCache<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> RequestCache<T> {
    /// Create a cache on the system clock.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache on an injected clock.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    entries: HashMap::new(),
                    tags: TagIndex::new(),
                    next_request: 0,
                }),
                clock,
                config,
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.shared.config
    }

    /// Snapshot of the entry for `key`, if any.
    ///
    /// Does not count as an access and never waits for a request. An entry
    /// past its retention window is evicted here and reported as absent.
    pub fn get(&self, key: &RequestKey) -> Option<CacheEntry<T>> {
        let now = self.shared.clock.now();
        let mut inner = self.shared.lock();
        inner.evict_if_expired(key, now, self.shared.config.retention);
        let slot = inner.entries.get(key)?;
        Some(CacheEntry {
            key: key.clone(),
            status: slot.status,
            data: slot.data.clone(),
            error: slot.error.clone(),
            inserted_at: slot.inserted_at,
            last_accessed_at: slot.last_accessed_at,
            fulfilled_at: slot.fulfilled_at,
            subscriber_count: slot.subscriber_count,
            stale: slot.stale,
            tags: inner.tags.tags_of(key),
        })
    }

    /// Drop one subscriber from `key`; at zero the retention countdown
    /// restarts. Called when a [`Subscription`] is dropped.
    pub(crate) fn unsubscribe(&self, key: &RequestKey) {
        let now = self.shared.clock.now();
        let mut inner = self.shared.lock();
        if let Some(slot) = inner.entries.get_mut(key) {
            slot.subscriber_count = slot.subscriber_count.saturating_sub(1);
            if slot.subscriber_count == 0 {
                slot.last_accessed_at = now;
                debug!(key = %key, "last subscriber left, retention started");
            }
        }
    }

    /// Mark every entry tagged with `tag` stale and evict the unsubscribed ones.
    pub fn invalidate(&self, tag: &Tag) -> Invalidation {
        let mut inner = self.shared.lock();
        let mut outcome = Invalidation::default();
        for key in inner.tags.keys_for(tag) {
            let Some(slot) = inner.entries.get_mut(&key) else {
                continue;
            };
            if slot.subscriber_count == 0 {
                inner.remove(&key, "invalidation");
                outcome.evicted.push(key);
            } else {
                slot.stale = true;
                slot.publish();
                outcome.marked_stale.push(key);
            }
        }
        debug!(
            tag = %tag,
            evicted = outcome.evicted.len(),
            stale = outcome.marked_stale.len(),
            "tag invalidated"
        );
        outcome
    }

    /// Evict every entry past its retention window. Returns how many went.
    pub fn sweep(&self) -> usize {
        let now = self.shared.clock.now();
        let retention = self.shared.config.retention;
        let mut inner = self.shared.lock();
        let expired: Vec<RequestKey> = inner
            .entries
            .iter()
            .filter(|(_, slot)| slot.is_expired(now, retention))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            inner.remove(key, "retention");
        }
        expired.len()
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.shared.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Send + Sync + 'static> RequestCache<T> {
    /// Register interest in `key`.
    ///
    /// `tags` are attached when the entry is first created. `request_fn` is
    /// only called when a new request has to start; see the module docs.
    ///
    /// # Panics
    ///
    /// Requires a tokio runtime context when a request is started.
    pub fn subscribe<F, Fut>(
        &self,
        key: RequestKey,
        tags: impl IntoIterator<Item = Tag>,
        request_fn: F,
    ) -> Subscription<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let now = self.shared.clock.now();
        let (rx, start) = {
            let mut guard = self.shared.lock();
            guard.evict_if_expired(&key, now, self.shared.config.retention);
            let id = guard.next_request_id();
            let inner = &mut *guard;

            let slot = match inner.entries.entry(key.clone()) {
                Entry::Occupied(occupied) => occupied.into_mut(),
                Entry::Vacant(vacant) => {
                    inner.tags.associate(&key, tags);
                    vacant.insert(Slot::new(now))
                }
            };
            slot.subscriber_count += 1;
            slot.last_accessed_at = now;

            let endpoint = key.endpoint().to_string();
            let start = if slot.is_fresh() {
                debug!(key = %key, "cache hit");
                metrics::counter!(telemetry::CACHE_HITS_TOTAL, "endpoint" => endpoint).increment(1);
                None
            } else if slot.in_flight && !slot.stale {
                debug!(key = %key, "joining in-flight request");
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "endpoint" => endpoint).increment(1);
                None
            } else {
                if slot.in_flight {
                    debug!(key = %key, superseded = slot.latest_request, request = id, "entry invalidated mid-request, refetching");
                } else {
                    debug!(key = %key, request = id, "cache miss, fetching");
                }
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "endpoint" => endpoint).increment(1);
                slot.begin_request(id);
                Some(id)
            };
            // Subscribed after any Loading publish so `changed` waits for the outcome.
            (slot.tx.subscribe(), start)
        };

        if let Some(id) = start {
            self.spawn_request(key.clone(), id, request_fn());
        }

        Subscription {
            cache: self.clone(),
            key,
            rx,
        }
    }

    /// Start a new request for an existing entry, superseding any request
    /// already in flight for it.
    ///
    /// This is the explicit retry path. Returns `false` (and does not call
    /// `request_fn`) when the cache holds no entry for `key`.
    pub fn refetch<F, Fut>(&self, key: &RequestKey, request_fn: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let id = {
            let mut inner = self.shared.lock();
            let id = inner.next_request_id();
            let Some(slot) = inner.entries.get_mut(key) else {
                return false;
            };
            if slot.in_flight {
                debug!(key = %key, superseded = slot.latest_request, request = id, "refetch supersedes in-flight request");
            }
            slot.begin_request(id);
            id
        };
        self.spawn_request(key.clone(), id, request_fn());
        true
    }

    /// Run [`sweep`](Self::sweep) every `period` on a background task.
    ///
    /// The task ends once every handle to the cache is dropped.
    pub fn spawn_sweeper(&self, period: Duration) -> JoinHandle<()> {
        let weak: Weak<Shared<T>> = Arc::downgrade(&self.shared);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                let evicted = RequestCache { shared }.sweep();
                if evicted > 0 {
                    debug!(evicted, "retention sweep");
                }
            }
        })
    }

    fn spawn_request<Fut>(&self, key: RequestKey, id: u64, fut: Fut)
    where
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let weak = Arc::downgrade(&self.shared);
        tokio::spawn(async move {
            let started = Instant::now();
            let result = fut.await;

            let endpoint = key.endpoint().to_string();
            let status = if result.is_ok() { "ok" } else { "error" };
            metrics::counter!(
                telemetry::REQUESTS_TOTAL,
                "endpoint" => endpoint.clone(),
                "status" => status
            )
            .increment(1);
            metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS, "endpoint" => endpoint)
                .record(started.elapsed().as_secs_f64());

            if let Some(shared) = weak.upgrade() {
                RequestCache { shared }.commit(&key, id, result);
            }
        });
    }

    /// Store the outcome of request `id`, unless a newer request owns the key.
    fn commit(&self, key: &RequestKey, id: u64, result: Result<T>) {
        let now = self.shared.clock.now();
        let mut inner = self.shared.lock();
        let Some(slot) = inner.entries.get_mut(key) else {
            debug!(key = %key, request = id, "entry gone before response arrived, discarding");
            return;
        };
        if slot.latest_request != id {
            warn!(key = %key, request = id, latest = slot.latest_request, "discarding superseded response");
            metrics::counter!(telemetry::STALE_RESPONSES_TOTAL, "endpoint" => key.endpoint().to_string())
                .increment(1);
            return;
        }

        slot.in_flight = false;
        match result {
            Ok(value) => {
                slot.status = QueryStatus::Success;
                slot.data = Some(Arc::new(value));
                slot.error = None;
                slot.fulfilled_at = Some(now);
                slot.last_accessed_at = now;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "request failed");
                slot.status = QueryStatus::Error;
                slot.error = Some(e);
            }
        }
        slot.publish();
    }
}

/// Live interest in one cache entry.
///
/// Dropping the subscription (or calling [`unsubscribe`](Self::unsubscribe))
/// releases it. A request still in flight keeps running and its response is
/// cached, but this handle no longer sees it.
pub struct Subscription<T> {
    cache: RequestCache<T>,
    key: RequestKey,
    rx: watch::Receiver<QueryState<T>>,
}

impl<T> Subscription<T> {
    pub fn key(&self) -> &RequestKey {
        &self.key
    }

    /// Current state of the entry.
    pub fn state(&self) -> QueryState<T> {
        self.rx.borrow().clone()
    }

    /// Release this subscription.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl<T: Send + Sync + 'static> Subscription<T> {
    /// Wait for the next state transition.
    ///
    /// Returns `None` if the entry is gone.
    pub async fn changed(&mut self) -> Option<QueryState<T>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Wait until no request is in flight and return that state.
    pub async fn settled(&mut self) -> QueryState<T> {
        loop {
            let state = self.rx.borrow_and_update().clone();
            if !state.is_fetching {
                return state;
            }
            if self.rx.changed().await.is_err() {
                return self.rx.borrow().clone();
            }
        }
    }

    /// Stream of states, starting with the current one.
    pub fn updates(&self) -> WatchStream<QueryState<T>> {
        WatchStream::new(self.rx.clone())
    }

    /// Explicit retry: start a new request for this key.
    pub fn refetch<F, Fut>(&self, request_fn: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.cache.refetch(&self.key, request_fn)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.cache.unsubscribe(&self.key);
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("status", &self.rx.borrow().status)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Request function that counts its invocations.
    fn counted(
        calls: &Arc<AtomicUsize>,
        value: u32,
    ) -> impl FnOnce() -> std::future::Ready<Result<u32>> + use<> {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(value))
        }
    }

    fn key(q: &str) -> RequestKey {
        RequestKey::new("/businesses/search").param("q", q)
    }

    fn cache_with_clock() -> (RequestCache<u32>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = RequestCache::with_clock(CacheConfig::default(), clock.clone());
        (cache, clock)
    }

    #[tokio::test]
    async fn miss_then_success() {
        let (cache, _) = cache_with_clock();
        let mut sub = cache.subscribe(key("a"), [], || async { Ok(7) });
        assert_eq!(sub.state().status, QueryStatus::Loading);
        assert!(sub.state().is_loading());

        let state = sub.settled().await;
        assert!(state.is_success());
        assert_eq!(state.data.as_deref(), Some(&7));
    }

    #[tokio::test]
    async fn fresh_hit_skips_request() {
        let (cache, _) = cache_with_clock();
        let mut first = cache.subscribe(key("a"), [], || async { Ok(1) });
        first.settled().await;

        let calls = Arc::new(AtomicUsize::new(0));
        let second = cache.subscribe(key("a"), [], counted(&calls, 2));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(second.state().data.as_deref(), Some(&1));
        assert_eq!(cache.get(&key("a")).unwrap().subscriber_count, 2);
    }

    #[tokio::test]
    async fn unsubscribe_keeps_entry_until_retention() {
        let (cache, clock) = cache_with_clock();
        let mut sub = cache.subscribe(key("a"), [], || async { Ok(1) });
        sub.settled().await;
        sub.unsubscribe();

        clock.advance(Duration::from_secs(119));
        let entry = cache.get(&key("a")).expect("still retained");
        assert_eq!(entry.subscriber_count, 0);

        clock.advance(Duration::from_secs(2));
        assert!(cache.get(&key("a")).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn subscribed_entry_never_expires() {
        let (cache, clock) = cache_with_clock();
        let mut sub = cache.subscribe(key("a"), [], || async { Ok(1) });
        sub.settled().await;

        clock.advance(Duration::from_secs(3600));
        assert_eq!(cache.sweep(), 0);
        assert!(cache.get(&key("a")).is_some());
    }

    #[tokio::test]
    async fn error_is_stored_not_retried() {
        let (cache, _) = cache_with_clock();
        let mut sub = cache.subscribe(key("a"), [], || async {
            Err(LookupError::Network("connection refused".into()))
        });
        let state = sub.settled().await;
        assert!(state.is_error());
        assert!(matches!(state.error, Some(LookupError::Network(_))));
        assert!(!state.is_fetching);
    }

    #[tokio::test]
    async fn refetch_without_entry_is_noop() {
        let (cache, _) = cache_with_clock();
        let calls = Arc::new(AtomicUsize::new(0));
        let started = cache.refetch(&key("missing"), counted(&calls, 1));
        assert!(!started);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn sweep_removes_only_expired() {
        let (cache, clock) = cache_with_clock();
        let mut a = cache.subscribe(key("a"), [], || async { Ok(1) });
        a.settled().await;
        drop(a);
        clock.advance(Duration::from_secs(60));

        let mut b = cache.subscribe(key("b"), [], || async { Ok(2) });
        b.settled().await;
        drop(b);
        clock.advance(Duration::from_secs(61));

        assert_eq!(cache.sweep(), 1);
        assert!(cache.get(&key("a")).is_none());
        assert!(cache.get(&key("b")).is_some());
    }

    #[test]
    fn config_defaults() {
        assert_eq!(CacheConfig::default().retention, Duration::from_secs(120));
    }
}
