//! Form submission error types.

use thiserror::Error;

/// Submission error variants.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum SubmissionError {
    #[error("validation failed: {message}")]
    Validation { message: String },

    #[error("network error: {message}")]
    Network { message: String },

    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("unexpected response: {message}")]
    Unknown { status: Option<u16>, message: String },
}

impl SubmissionError {
    /// Creates a validation error from every problem found, joined for display.
    #[must_use]
    pub fn validation(problems: &[String]) -> Self {
        Self::Validation {
            message: problems.join(", "),
        }
    }

    /// Creates network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates unknown error.
    #[must_use]
    pub fn unknown(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Unknown {
            status,
            message: message.into(),
        }
    }

    /// Maps a non-success HTTP status to the error taxonomy.
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>, retry_after_ms: Option<u64>) -> Self {
        let message = message.into();
        match status {
            400 => Self::Validation { message },
            429 => Self::RateLimited {
                retry_after_ms: retry_after_ms.unwrap_or(5000),
            },
            500..=599 => Self::Server { status, message },
            _ => Self::Unknown {
                status: Some(status),
                message,
            },
        }
    }

    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Network { .. } => "NETWORK_ERROR",
            Self::Timeout { .. } => "TIMEOUT",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::Server { .. } => "SERVER_ERROR",
            Self::Unknown { .. } => "UNKNOWN_ERROR",
        }
    }

    /// Message suitable for showing to a site visitor.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message } => format!("Please check your input: {message}"),
            Self::Network { .. } => {
                "Unable to connect. Please check your internet connection and try again."
                    .to_string()
            }
            Self::Timeout { .. } => "The request took too long. Please try again.".to_string(),
            Self::RateLimited { .. } => {
                "Too many requests. Please wait a moment and try again.".to_string()
            }
            Self::Server { .. } => {
                "Our servers are having trouble right now. Please try again later.".to_string()
            }
            Self::Unknown { .. } => "An unexpected error occurred. Please try again.".to_string(),
        }
    }

    /// Returns whether another attempt may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Timeout { .. } | Self::RateLimited { .. } | Self::Server { .. }
        )
    }
}
