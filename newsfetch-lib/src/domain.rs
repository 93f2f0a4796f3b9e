//! Domain key resolution for throttling.
//!
//! Every task is throttled by the host component of its URL. URLs that cannot
//! be parsed, or that have no host, all share the fallback key `"unknown"`.

use crate::error::FetchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Key shared by every task whose URL has no resolvable host.
pub const UNKNOWN_DOMAIN: &str = "unknown";

/// Lower-cased host a request is throttled under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainKey(String);

impl DomainKey {
    /// Build a key directly from a host name.
    pub fn new<S: AsRef<str>>(host: S) -> Self {
        Self(host.as_ref().trim().to_lowercase())
    }

    /// The shared fallback key.
    pub fn unknown() -> Self {
        Self(UNKNOWN_DOMAIN.to_string())
    }

    /// Resolve the key for a URL, falling back to [`DomainKey::unknown`].
    pub fn from_url(url: &str) -> Self {
        match resolve_host(url) {
            Ok(key) => key,
            Err(e) => {
                tracing::debug!(%url, error = %e, "routing task to fallback domain");
                Self::unknown()
            }
        }
    }

    /// Whether this is the fallback key.
    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_DOMAIN
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DomainKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Extract the host of `url` as a [`DomainKey`].
///
/// # Errors
///
/// Returns `FetchError::InvalidUrl` if the URL does not parse or has no host.
pub fn resolve_host(url: &str) -> Result<DomainKey, FetchError> {
    let parsed = Url::parse(url.trim())
        .map_err(|e| FetchError::invalid_url(url, e.to_string()))?;

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(DomainKey::new(host)),
        _ => Err(FetchError::invalid_url(url, "URL has no host")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_is_lowercased() {
        assert_eq!(
            DomainKey::from_url("https://News.Example.COM/a/b?c=1").as_str(),
            "news.example.com"
        );
    }

    #[test]
    fn test_port_and_path_are_ignored() {
        let a = DomainKey::from_url("http://example.com:8080/one");
        let b = DomainKey::from_url("https://example.com/two#frag");
        assert_eq!(a, b);
    }

    #[test]
    fn test_subdomains_are_distinct() {
        assert_ne!(
            DomainKey::from_url("https://www.example.com/"),
            DomainKey::from_url("https://example.com/")
        );
    }

    #[test]
    fn test_unparsable_urls_share_fallback() {
        let a = DomainKey::from_url("not a url");
        let b = DomainKey::from_url("");
        let c = DomainKey::from_url("mailto:someone@example.com");
        assert!(a.is_unknown());
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_resolve_host_errors() {
        assert!(matches!(
            resolve_host("::::"),
            Err(FetchError::InvalidUrl { .. })
        ));
        assert!(matches!(
            resolve_host("data:text/plain,hello"),
            Err(FetchError::InvalidUrl { .. })
        ));
    }
}
