//! Query cache error types.

use thiserror::Error;

/// Query error variants.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum QueryError {
    #[error("query {key} failed after {attempts} attempts: {message}")]
    FetchFailed {
        key: String,
        attempts: u32,
        message: String,
    },

    #[error("cached data for {key} has a different type")]
    TypeMismatch { key: String },
}
