//! # Newsfetch Library
//!
//! Fetch many article pages concurrently without hammering any single site.
//!
//! A [`FetchPool`] runs a batch of [`FetchTask`]s on a bounded set of workers.
//! Requests to the same host are spaced by a minimum interval (500ms by
//! default) while requests to different hosts proceed in parallel. Every task
//! yields exactly one [`FetchResult`]; a failing page never aborts the batch.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use newsfetch_lib::{FetchPool, FetchTask, HttpPageFetcher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = FetchPool::new(HttpPageFetcher::new()?);
//!     let tasks = vec![
//!         FetchTask::new("https://example.com/one"),
//!         FetchTask::new("https://example.org/two"),
//!     ];
//!
//!     for result in pool.run(tasks).await? {
//!         match &result.error {
//!             None => println!("{}: {} chars", result.task.url, result.content.len()),
//!             Some(e) => println!("{}: {}", result.task.url, e),
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Per-domain throttling**: first request to a host goes out immediately
//! - **Bounded concurrency**: at most 10 requests in flight by default
//! - **Pluggable fetching**: bring your own [`PageFetcher`] or use [`fetch_fn`]
//! - **News search**: turn a keyword into tasks (`search` feature)

// Re-export main public API types and functions
// This makes them available as newsfetch_lib::TypeName
pub use config::{load_env_config, ConfigManager, EnvConfig, FileConfig, OutputConfig};
pub use domain::{resolve_host, DomainKey, UNKNOWN_DOMAIN};
pub use error::FetchError;
pub use fetcher::{fetch_fn, FnFetcher, HttpPageFetcher, PageFetcher};
pub use pool::{run_batch, FetchPool};
#[cfg(feature = "search")]
pub use search::{parse_search_results, NewsSearch};
pub use throttle::DomainThrottle;
pub use types::{
    FetchConfig, FetchResult, FetchTask, SearchConfig, DEFAULT_MAX_ARTICLES,
    DEFAULT_MAX_CONTENT_CHARS, DEFAULT_MAX_WORKERS, DEFAULT_MIN_INTERVAL, DEFAULT_TIMEOUT,
    MAX_WORKERS_LIMIT,
};
pub use utils::{parse_duration_string, parse_url_list, truncate_content};

// Internal modules - these are not part of the public API
mod config;
mod domain;
mod error;
mod fetcher;
mod pool;
#[cfg(feature = "search")]
mod search;
mod throttle;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, FetchError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");

/// Get library information for debugging or display purposes.
pub fn info() -> LibraryInfo {
    LibraryInfo {
        version: VERSION,
        author: AUTHOR,
        features: get_enabled_features(),
    }
}

/// Information about the library build and features
#[derive(Debug, Clone)]
pub struct LibraryInfo {
    pub version: &'static str,
    pub author: &'static str,
    pub features: Vec<&'static str>,
}

/// Get list of enabled features at compile time
#[allow(clippy::vec_init_then_push)]
fn get_enabled_features() -> Vec<&'static str> {
    let mut features = Vec::new();

    #[cfg(feature = "search")]
    features.push("search");

    features
}
