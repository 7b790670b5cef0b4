//! Error types for finance data operations.
//!
//! This module defines [`FinanceError`], the single error value surfaced by the
//! finance client and carried unchanged through the query cache to callers.

use thiserror::Error;

/// Errors that can occur while fetching or caching finance data.
#[derive(Error, Debug)]
pub enum FinanceError {
    /// Network-related errors (connection failures, timeouts, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// The API answered with a non-success status code.
    #[error("HTTP {status}: {body}")]
    Http {
        /// Response status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// Rate limit exceeded by the API.
    #[error("Rate limited: retry after {retry_after:?}")]
    RateLimited {
        /// Suggested time to wait before retrying.
        retry_after: Option<std::time::Duration>,
    },

    /// Error parsing a response payload.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error interacting with the query cache.
    #[error("Cache error: {0}")]
    Cache(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl FinanceError {
    /// Returns true if the error came from the transport or the remote API
    /// rather than from local validation.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Http { .. } | Self::RateLimited { .. } | Self::Parse(_)
        )
    }
}

/// Result type alias using [`FinanceError`].
pub type Result<T> = std::result::Result<T, FinanceError>;
