//! Client configuration
//!
//! [`SyncConfig`] customizes the synchronization client: where the backend
//! lives, how long cached reads stay fresh, how failures are retried, and
//! how many cache entries are retained.
//!
//! # Example
//! ```rust,ignore
//! use storefront_sync::SyncConfig;
//! use std::time::Duration;
//!
//! let config = SyncConfig::new()
//!     .with_base_url("https://shop.example.com/api")
//!     .with_catalog_staleness(Duration::from_secs(30));
//! ```

use crate::key::ResourceKey;
use std::time::Duration;

/// Environment variable overriding the API base URL.
pub const ENV_API_URL: &str = "STOREFRONT_API_URL";
/// Environment variable enabling the in-memory mock backend.
pub const ENV_USE_MOCK: &str = "STOREFRONT_USE_MOCK";

/// Configuration for [`SyncClient`](crate::SyncClient).
///
/// All fields have defaults that work against a local development backend.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the REST backend (default: `http://127.0.0.1:8000/api`)
    pub base_url: String,
    /// Serve every call from the in-memory mock backend (default: false)
    pub use_mock: bool,
    /// Freshness window for catalog and content reads (default: 60 s)
    pub catalog_staleness: Duration,
    /// Freshness window for session-derived reads (default: 5 min)
    pub session_staleness: Duration,
    /// Automatic retries for transient query failures (default: 1)
    pub retry_limit: u32,
    /// Retained cache entries before least-recently-read eviction (default: 256)
    pub cache_capacity: usize,
    /// Transport-level request timeout (default: 30 s)
    pub request_timeout: Duration,
    /// Key families evicted together when the session expires.
    ///
    /// Defaults to the session principal plus everything it gates:
    /// cart, orders, and profile.
    pub session_gated: Vec<ResourceKey>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/api".to_string(),
            use_mock: false,
            catalog_staleness: Duration::from_secs(60),
            session_staleness: Duration::from_secs(5 * 60),
            retry_limit: 1,
            cache_capacity: 256,
            request_timeout: Duration::from_secs(30),
            session_gated: vec![
                ResourceKey::new("user"),
                ResourceKey::new("cart"),
                ResourceKey::new("orders"),
                ResourceKey::new("profile"),
            ],
        }
    }
}

impl SyncConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration from the process environment.
    ///
    /// Honors [`ENV_API_URL`] and [`ENV_USE_MOCK`] (`"true"`/`"1"`); every
    /// other field keeps its default.
    pub fn from_env() -> Self {
        Self::default().apply_env(
            std::env::var(ENV_API_URL).ok(),
            std::env::var(ENV_USE_MOCK).ok(),
        )
    }

    fn apply_env(mut self, base_url: Option<String>, use_mock: Option<String>) -> Self {
        if let Some(url) = base_url {
            if !url.is_empty() {
                self.base_url = url;
            }
        }
        if let Some(flag) = use_mock {
            self.use_mock = matches!(flag.as_str(), "true" | "1");
        }
        self
    }

    /// Set the backend base URL. A trailing slash is stripped.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Enable or disable the in-memory mock backend.
    pub fn with_mock(mut self, use_mock: bool) -> Self {
        self.use_mock = use_mock;
        self
    }

    /// Set the freshness window for catalog and content reads.
    pub fn with_catalog_staleness(mut self, window: Duration) -> Self {
        self.catalog_staleness = window;
        self
    }

    /// Set the freshness window for session-derived reads.
    pub fn with_session_staleness(mut self, window: Duration) -> Self {
        self.session_staleness = window;
        self
    }

    /// Set the automatic retry limit for transient query failures.
    pub fn with_retry_limit(mut self, retries: u32) -> Self {
        self.retry_limit = retries;
        self
    }

    /// Set the cache retention capacity.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Set the transport-level request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.base_url, "http://127.0.0.1:8000/api");
        assert!(!config.use_mock);
        assert_eq!(config.retry_limit, 1);
        assert!(config.session_staleness > config.catalog_staleness);
        assert_eq!(config.session_gated.len(), 4);
    }

    #[test]
    fn test_builders() {
        let config = SyncConfig::new()
            .with_base_url("https://shop.example.com/api/")
            .with_mock(true)
            .with_retry_limit(0)
            .with_cache_capacity(16);
        assert_eq!(config.base_url, "https://shop.example.com/api");
        assert!(config.use_mock);
        assert_eq!(config.retry_limit, 0);
        assert_eq!(config.cache_capacity, 16);
    }

    #[test]
    fn test_env_overrides() {
        let config = SyncConfig::default().apply_env(
            Some("https://prod.example.com/api".to_string()),
            Some("true".to_string()),
        );
        assert_eq!(config.base_url, "https://prod.example.com/api");
        assert!(config.use_mock);

        let config = SyncConfig::default().apply_env(Some(String::new()), Some("false".to_string()));
        assert_eq!(config.base_url, "http://127.0.0.1:8000/api");
        assert!(!config.use_mock);
    }
}
