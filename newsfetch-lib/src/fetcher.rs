//! Page-fetch collaborators.
//!
//! The pool never talks to the network itself; it hands each URL to a
//! [`PageFetcher`]. [`HttpPageFetcher`] is the reqwest-backed implementation
//! used by the CLI, and [`fetch_fn`] adapts a plain async closure (handy for
//! tests and for callers that bring their own extraction).

use crate::error::FetchError;
use crate::types::FetchConfig;
use crate::utils::truncate_content;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Retrieves the content behind a URL.
///
/// Implementations must be safe to call concurrently from several workers;
/// every call is independent.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url`, giving up after `timeout`.
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, FetchError>;
}

/// [`PageFetcher`] backed by an async closure.
pub struct FnFetcher<F> {
    func: F,
}

/// Wrap an async closure `(url, timeout) -> Result<String, FetchError>` as a fetcher.
///
/// ```rust
/// use newsfetch_lib::{fetch_fn, FetchError};
///
/// let fetcher = fetch_fn(|url: String, _timeout| async move {
///     Ok::<_, FetchError>(format!("content of {}", url))
/// });
/// # let _ = fetcher;
/// ```
pub fn fetch_fn<F, Fut>(func: F) -> FnFetcher<F>
where
    F: Fn(String, Duration) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, FetchError>> + Send + 'static,
{
    FnFetcher { func }
}

#[async_trait]
impl<F, Fut> PageFetcher for FnFetcher<F>
where
    F: Fn(String, Duration) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, FetchError>> + Send + 'static,
{
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        (self.func)(url.to_string(), timeout).await
    }
}

/// HTTP page fetcher.
///
/// Issues a GET per call, treats any non-2xx status as an error and returns the
/// response body, truncated to `max_content_chars` when set. No retries.
#[derive(Clone)]
pub struct HttpPageFetcher {
    /// Shared HTTP client (connection pool is reused across workers)
    http_client: reqwest::Client,
    /// Truncation limit for returned content
    max_content_chars: Option<usize>,
}

impl HttpPageFetcher {
    /// Create a fetcher with default settings.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_config(&FetchConfig::default())
    }

    /// Create a fetcher from a [`FetchConfig`].
    pub fn with_config(config: &FetchConfig) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout.saturating_add(Duration::from_secs(2))) // per-request timeout is set on each call
            .build()
            .map_err(|e| {
                FetchError::network_with_source(
                    "<client>",
                    "Failed to create HTTP client",
                    e.to_string(),
                )
            })?;

        Ok(Self {
            http_client,
            max_content_chars: config.max_content_chars,
        })
    }

    /// Create a fetcher around an existing client.
    pub fn with_client(http_client: reqwest::Client, max_content_chars: Option<usize>) -> Self {
        Self {
            http_client,
            max_content_chars,
        }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let response = self
            .http_client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::timeout(url, timeout)
                } else if e.is_builder() {
                    FetchError::invalid_url(url, e.to_string())
                } else {
                    FetchError::network_with_source(url, "Request failed", e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%url, status = status.as_u16(), "non-success status");
            return Err(FetchError::status(url, status.as_u16()));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::timeout(url, timeout)
            } else {
                FetchError::parse(format!("Failed to read body of '{}': {}", url, e))
            }
        })?;

        Ok(match self.max_content_chars {
            Some(limit) => truncate_content(&body, limit),
            None => body,
        })
    }
}
