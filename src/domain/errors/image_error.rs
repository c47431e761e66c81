//! Image fetch error types.

use thiserror::Error;

/// Errors that can occur while fetching an image.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ImageFetchError {
    /// URL could not be resolved to a fetchable location.
    #[error("invalid image url: {0}")]
    InvalidUrl(String),
    /// Transport failure.
    #[error("network error: {0}")]
    Network(String),
    /// Non-success response.
    #[error("HTTP {status}")]
    Http {
        /// Response status.
        status: u16,
    },
    /// Body was not a decodable image.
    #[error("decode error: {0}")]
    Decode(String),
    /// The load did not settle in time.
    #[error("image load timed out after {timeout_ms}ms")]
    Timeout {
        /// Elapsed limit in milliseconds.
        timeout_ms: u64,
    },
}

impl ImageFetchError {
    /// Creates HTTP status error.
    #[must_use]
    pub const fn http(status: u16) -> Self {
        Self::Http { status }
    }
}
