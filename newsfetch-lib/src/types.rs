//! Core data types for article fetching.
//!
//! This module defines the task and result records that flow through the
//! fetch pool, plus the configuration that controls its behavior.

use crate::domain::DomainKey;
use crate::error::FetchError;
use serde::{Deserialize, Serialize, Serializer};
use std::time::Duration;
use tokio::time::Instant;

/// Default cap on concurrently running workers.
pub const DEFAULT_MAX_WORKERS: usize = 10;

/// Upper bound accepted for the worker cap.
pub const MAX_WORKERS_LIMIT: usize = 100;

/// Default spacing between two requests to the same domain.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(500);

/// Default per-request timeout handed to the page fetcher.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default limit on stored article content, in characters.
pub const DEFAULT_MAX_CONTENT_CHARS: usize = 5000;

/// Default search endpoint.
pub const DEFAULT_SEARCH_URL: &str = "https://news.google.com/search";

/// Default cap on search results turned into tasks.
pub const DEFAULT_MAX_ARTICLES: usize = 20;

/// Search settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search page URL
    pub base_url: String,
    /// Interface language, e.g. "en-US"
    pub language: String,
    /// Country, e.g. "US"
    pub region: String,
    /// Maximum number of articles to return
    pub max_articles: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SEARCH_URL.to_string(),
            language: "en-US".to_string(),
            region: "US".to_string(),
            max_articles: DEFAULT_MAX_ARTICLES,
        }
    }
}

impl SearchConfig {
    /// Edition id sent as `ceid`, e.g. "US:en".
    pub fn edition(&self) -> String {
        let lang = self
            .language
            .split('-')
            .next()
            .unwrap_or(&self.language)
            .to_lowercase();
        format!("{}:{}", self.region, lang)
    }
}

/// A single page to fetch.
///
/// Tasks are immutable once handed to the pool; each one comes back exactly
/// once inside a [`FetchResult`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchTask {
    /// The page URL (also the article link)
    pub url: String,

    /// Headline the link was listed under, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
}

impl FetchTask {
    /// Create a task for a bare URL.
    pub fn new<U: Into<String>>(url: U) -> Self {
        Self {
            url: url.into(),
            headline: None,
        }
    }

    /// Create a task for a search result.
    pub fn article<H: Into<String>, U: Into<String>>(headline: H, url: U) -> Self {
        Self {
            url: url.into(),
            headline: Some(headline.into()),
        }
    }

    /// Attach a headline.
    pub fn with_headline<H: Into<String>>(mut self, headline: H) -> Self {
        self.headline = Some(headline.into());
        self
    }

    /// Headline if present, URL otherwise.
    pub fn label(&self) -> &str {
        self.headline.as_deref().unwrap_or(&self.url)
    }
}

/// Outcome of fetching one task.
#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    /// The task this result belongs to
    #[serde(flatten)]
    pub task: FetchTask,

    /// Domain the request was throttled under
    pub domain: DomainKey,

    /// Page content; empty when the fetch failed
    pub content: String,

    /// Why the fetch failed, if it did
    #[serde(
        serialize_with = "serialize_error",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<FetchError>,

    /// When the throttle released this request
    #[serde(skip)]
    pub dispatched_at: Instant,

    /// How long the page fetch took
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_duration: Option<Duration>,
}

impl FetchResult {
    /// Successful fetch.
    pub fn success(
        task: FetchTask,
        domain: DomainKey,
        content: String,
        dispatched_at: Instant,
        fetch_duration: Duration,
    ) -> Self {
        Self {
            task,
            domain,
            content,
            error: None,
            dispatched_at,
            fetch_duration: Some(fetch_duration),
        }
    }

    /// Failed fetch: content is always empty.
    pub fn failure(
        task: FetchTask,
        domain: DomainKey,
        error: FetchError,
        dispatched_at: Instant,
        fetch_duration: Option<Duration>,
    ) -> Self {
        Self {
            task,
            domain,
            content: String::new(),
            error: Some(error),
            dispatched_at,
            fetch_duration,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Successful and carrying non-empty content.
    pub fn has_content(&self) -> bool {
        self.error.is_none() && !self.content.is_empty()
    }
}

fn serialize_error<S: Serializer>(
    error: &Option<FetchError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_str(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Configuration for fetch batches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Cap on concurrently running workers
    /// Default: 10, Range: 1-100
    pub max_workers: usize,

    /// Minimum spacing between requests to one domain
    /// Default: 500ms
    #[serde(skip)]
    pub min_interval: Duration,

    /// Timeout handed to the page fetcher for each request
    /// Default: 10 seconds
    #[serde(skip)]
    pub timeout: Duration,

    /// User agent sent by the HTTP fetcher
    pub user_agent: String,

    /// Truncate fetched content to this many characters (None = unlimited)
    /// Default: 5000
    pub max_content_chars: Option<usize>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            min_interval: DEFAULT_MIN_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("newsfetch/{}", env!("CARGO_PKG_VERSION")),
            max_content_chars: Some(DEFAULT_MAX_CONTENT_CHARS),
        }
    }
}

impl FetchConfig {
    /// Set the worker cap.
    ///
    /// Automatically clamps to 1-100 to prevent resource exhaustion.
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.clamp(1, MAX_WORKERS_LIMIT);
        self
    }

    /// Set per-domain request spacing.
    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    /// Set per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the HTTP user agent.
    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the content length limit.
    pub fn with_max_content_chars(mut self, max_content_chars: Option<usize>) -> Self {
        self.max_content_chars = max_content_chars;
        self
    }

    /// Check settings that can be wrong even after the builder clamps.
    pub fn validate(&self) -> Result<(), FetchError> {
        if self.max_workers == 0 || self.max_workers > MAX_WORKERS_LIMIT {
            return Err(FetchError::config(format!(
                "max_workers must be between 1 and {}, got {}",
                MAX_WORKERS_LIMIT, self.max_workers
            )));
        }
        if self.timeout.is_zero() {
            return Err(FetchError::config("timeout must be greater than zero"));
        }
        Ok(())
    }
}
