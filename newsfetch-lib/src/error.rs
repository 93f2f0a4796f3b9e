//! Error handling for fetch operations.
//!
//! This module defines the error type shared by the fetch pool, the page-fetch
//! collaborators and configuration loading. Per-task errors end up inside a
//! `FetchResult`; only configuration errors ever fail a whole batch.

use std::fmt;
use std::time::Duration;

/// Main error type for fetch operations.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Connection, DNS or other transport-level failure
    NetworkError {
        url: String,
        message: String,
        source: Option<String>,
    },

    /// The request did not complete within its timeout
    Timeout { url: String, duration: Duration },

    /// The server answered with a non-success status code
    Status { url: String, status: u16 },

    /// The response (or a search page) could not be parsed
    ParseError { message: String },

    /// A URL could not be parsed or has no host
    InvalidUrl { url: String, reason: String },

    /// Invalid settings (worker count, durations, etc.)
    ConfigError { message: String },

    /// File I/O errors when reading URL lists or config files
    FileError { path: String, message: String },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl FetchError {
    /// Create a new network error.
    pub fn network<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::NetworkError {
            url: url.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a new network error with source information.
    pub fn network_with_source<U: Into<String>, M: Into<String>, S: Into<String>>(
        url: U,
        message: M,
        source: S,
    ) -> Self {
        Self::NetworkError {
            url: url.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<U: Into<String>>(url: U, duration: Duration) -> Self {
        Self::Timeout {
            url: url.into(),
            duration,
        }
    }

    /// Create a new HTTP status error.
    pub fn status<U: Into<String>>(url: U, status: u16) -> Self {
        Self::Status {
            url: url.into(),
            status,
        }
    }

    /// Create a new parse error.
    pub fn parse<M: Into<String>>(message: M) -> Self {
        Self::ParseError {
            message: message.into(),
        }
    }

    /// Create a new invalid URL error.
    pub fn invalid_url<U: Into<String>, R: Into<String>>(url: U, reason: R) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this error suggests the request could succeed on a later attempt.
    ///
    /// The pool never retries on its own; this is a hint for callers that do.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError { .. }
                | Self::Timeout { .. }
                | Self::Status {
                    status: 429 | 500..=599,
                    ..
                }
        )
    }

    /// Whether this error belongs to the transport taxonomy (reported per task).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::NetworkError { .. }
                | Self::Timeout { .. }
                | Self::Status { .. }
                | Self::ParseError { .. }
        )
    }

    /// Short category name, stable enough for grouping in summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NetworkError { .. } => "network",
            Self::Timeout { .. } => "timeout",
            Self::Status { .. } => "status",
            Self::ParseError { .. } => "parse",
            Self::InvalidUrl { .. } => "invalid_url",
            Self::ConfigError { .. } => "config",
            Self::FileError { .. } => "file",
            Self::Internal { .. } => "internal",
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NetworkError {
                url,
                message,
                source,
            } => {
                if let Some(source) = source {
                    write!(f, "Network error for '{}': {} (source: {})", url, message, source)
                } else {
                    write!(f, "Network error for '{}': {}", url, message)
                }
            }
            Self::Timeout { url, duration } => {
                write!(f, "Timeout after {:?} fetching '{}'", duration, url)
            }
            Self::Status { url, status } => {
                write!(f, "HTTP {} for '{}'", status, url)
            }
            Self::ParseError { message } => {
                write!(f, "Parse error: {}", message)
            }
            Self::InvalidUrl { url, reason } => {
                write!(f, "Invalid URL '{}': {}", url, reason)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for FetchError {}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());

        if err.is_timeout() {
            Self::timeout(url, crate::types::DEFAULT_TIMEOUT)
        } else if let Some(status) = err.status() {
            Self::status(url, status.as_u16())
        } else if err.is_connect() {
            Self::network_with_source(url, "Connection failed", err.to_string())
        } else if err.is_decode() || err.is_body() {
            Self::parse(format!("Failed to read response body: {}", err))
        } else {
            Self::network_with_source(url, "HTTP request failed", err.to_string())
        }
    }
}
