//! Builder for configuring lookup instances

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use super::AbnLookup;
use crate::cache::{CacheConfig, Clock, RequestCache, SystemClock};
use crate::client::{DEFAULT_BASE_URL, HttpRegistryClient};
use crate::config::Config;
use crate::{LookupError, RegistryApi, Result};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Builder for configuring [`AbnLookup`] instances.
pub struct AbnLookupBuilder {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    cache_config: CacheConfig,
    sweep_interval: Option<Duration>,
    clock: Option<Arc<dyn Clock>>,
    api: Option<Arc<dyn RegistryApi>>,
}

impl AbnLookupBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout_secs: None,
            cache_config: CacheConfig::default(),
            sweep_interval: None,
            clock: None,
            api: None,
        }
    }

    /// Start from a loaded [`Config`].
    pub fn from_config(config: &Config) -> Self {
        Self::new()
            .base_url(config.api.base_url.clone())
            .timeout(config.timeout())
            .cache_config(config.cache_config())
            .sweep_interval(config.sweep_interval())
    }

    /// Set the registry API base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the HTTP request timeout (whole seconds, minimum 1).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = Some(timeout.as_secs().max(1));
        self
    }

    /// Set the response cache configuration.
    pub fn cache_config(mut self, config: CacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    /// Evict expired cache entries on a background task every `period`.
    ///
    /// Without this, expired entries only go when they are next touched.
    /// Building with a sweep interval requires a tokio runtime.
    pub fn sweep_interval(mut self, period: Duration) -> Self {
        self.sweep_interval = Some(period);
        self
    }

    /// Use a custom time source for cache retention.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Use a custom registry implementation instead of the HTTP client.
    ///
    /// `base_url` and `timeout` are ignored when this is set.
    pub fn api(mut self, api: Arc<dyn RegistryApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// Build the lookup.
    pub fn build(self) -> Result<AbnLookup> {
        let api: Arc<dyn RegistryApi> = match self.api {
            Some(api) => api,
            None => {
                let base_url = self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
                let timeout = self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
                Arc::new(HttpRegistryClient::with_options(
                    base_url,
                    Duration::from_secs(timeout),
                )?)
            }
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let cache = RequestCache::with_clock(self.cache_config, clock);
        if let Some(period) = self.sweep_interval {
            if period.is_zero() {
                return Err(LookupError::Configuration(
                    "sweep interval must be non-zero".to_string(),
                ));
            }
            Handle::try_current().map_err(|_| {
                LookupError::Configuration(
                    "a sweep interval needs a running tokio runtime".to_string(),
                )
            })?;
            // Detached: the task ends once the last cache handle is dropped.
            cache.spawn_sweeper(period);
        }
        Ok(AbnLookup::new(api, cache))
    }
}

impl Default for AbnLookupBuilder {
    fn default() -> Self {
        Self::new()
    }
}
