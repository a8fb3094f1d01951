//! Configuration loading.
//!
//! Configuration is loaded from a TOML file with the following resolution
//! order:
//! 1. `--config <path>` (explicit path, must exist)
//! 2. `~/.config/abn-lookup/config.toml` (user, optional)
//! 3. built-in defaults
//!
//! The `ABN_API_BASE_URL` environment variable overrides `api.base_url`.
//!
//! ```toml
//! [api]
//! base_url = "https://abr.example/api/v1"
//! timeout_secs = 30
//!
//! [cache]
//! retention_secs = 120
//! sweep_interval_secs = 60
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::client::DEFAULT_BASE_URL;
use crate::{LookupError, Result};

/// Environment variable that overrides the API base URL.
pub const BASE_URL_ENV: &str = "ABN_API_BASE_URL";

/// Client configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheSettings,
}

/// Registry API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the REST API (default: http://127.0.0.1:3000/api/v1).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Response cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// Seconds an unused response is kept (default: 120).
    #[serde(default = "default_retention")]
    pub retention_secs: u64,
    /// Seconds between background retention sweeps (default: 60).
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            retention_secs: default_retention(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_retention() -> u64 {
    120
}

fn default_sweep_interval() -> u64 {
    60
}

impl Config {
    /// Load configuration from the standard locations, then apply the
    /// environment override and validate.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let config = match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        let config = config.with_base_url_override(std::env::var(BASE_URL_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            LookupError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            LookupError::Configuration(msg) => {
                LookupError::Configuration(format!("{msg} (in {path:?})"))
            }
            other => other,
        })
    }

    /// Parse TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| LookupError::Configuration(format!("Failed to parse config: {e}")))
    }

    /// Replace the base URL when `base_url` is a non-empty value.
    pub fn with_base_url_override(mut self, base_url: Option<String>) -> Self {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.api.base_url = url.trim().to_string();
        }
        self
    }

    /// Check the values make sense before anything is built from them.
    pub fn validate(&self) -> Result<()> {
        crate::client::parse_base_url(&self.api.base_url)?;
        if self.api.timeout_secs == 0 {
            return Err(LookupError::Configuration(
                "api.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.cache.retention_secs == 0 {
            return Err(LookupError::Configuration(
                "cache.retention_secs must be greater than 0".to_string(),
            ));
        }
        if self.cache.sweep_interval_secs == 0 {
            return Err(LookupError::Configuration(
                "cache.sweep_interval_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cache.sweep_interval_secs)
    }

    /// Request cache configuration derived from `[cache]`.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new().retention(Duration::from_secs(self.cache.retention_secs))
    }

    /// `~/.config/abn-lookup/config.toml` (platform config dir).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("abn-lookup").join("config.toml"))
    }

    /// Resolve the config file path; `None` means "use defaults".
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(LookupError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        Ok(Self::default_path().filter(|p| p.exists()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.cache.retention_secs, 120);
        assert_eq!(config.cache.sweep_interval_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_minimal_config() {
        let config = Config::from_toml_str(
            r#"
            [api]
            base_url = "https://abr.example/api/v1"
        "#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "https://abr.example/api/v1");
        // Defaults preserved
        assert_eq!(config.cache.retention_secs, 120);
    }

    #[test]
    fn cache_config_uses_retention() {
        let config = Config::from_toml_str(
            r#"
            [cache]
            retention_secs = 5
        "#,
        )
        .unwrap();
        assert_eq!(config.cache_config().retention, Duration::from_secs(5));
    }

    #[test]
    fn override_replaces_base_url() {
        let config = Config::default()
            .with_base_url_override(Some(" https://override.example/api ".to_string()));
        assert_eq!(config.api.base_url, "https://override.example/api");

        let unchanged = Config::default().with_base_url_override(Some("  ".to_string()));
        assert_eq!(unchanged.api.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = Config::default();
        config.api.base_url = "/api/v1".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.cache.retention_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_configuration_error() {
        assert!(matches!(
            Config::from_toml_str("[api\nbase_url = 1"),
            Err(LookupError::Configuration(_))
        ));
    }
}
