//! Client configuration.
//!
//! Every module talks to one base URL. Values come from the environment
//! with builder-style overrides for tests and embedding applications.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Controls how long cached reads stay fresh and how long they are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryConfig {
    /// How long data is considered fresh before becoming stale.
    ///
    /// Fresh data is served from the cache without a network call; stale
    /// data is still shown but triggers a refetch.
    pub stale_time: Duration,

    /// How long an entry that nobody reads is retained before
    /// [`QueryClient::collect_garbage`](crate::query::QueryClient::collect_garbage)
    /// removes it.
    pub cache_time: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(30),
            cache_time: Duration::from_secs(5 * 60),
        }
    }
}

impl QueryConfig {
    #[must_use]
    pub const fn new(stale_time: Duration, cache_time: Duration) -> Self {
        Self {
            stale_time,
            cache_time,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub query: QueryConfig,
    /// Where the session is persisted between runs; in-memory when `None`.
    pub session_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            query: QueryConfig::default(),
            session_file: None,
        }
    }
}

impl ClientConfig {
    /// Read `BACKOFFICE_API_URL`, `BACKOFFICE_STALE_SECS`,
    /// `BACKOFFICE_CACHE_SECS` and `BACKOFFICE_SESSION_FILE`. Unset or
    /// unparsable values keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = lookup("BACKOFFICE_API_URL").filter(|v| !v.trim().is_empty()) {
            config.base_url = url.trim().to_string();
        }
        if let Some(secs) = lookup("BACKOFFICE_STALE_SECS").and_then(|v| v.parse().ok()) {
            config.query.stale_time = Duration::from_secs(secs);
        }
        if let Some(secs) = lookup("BACKOFFICE_CACHE_SECS").and_then(|v| v.parse().ok()) {
            config.query.cache_time = Duration::from_secs(secs);
        }
        config.session_file = lookup("BACKOFFICE_SESSION_FILE")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_query(mut self, query: QueryConfig) -> Self {
        self.query = query;
        self
    }

    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = Some(path.into());
        self
    }
}
