//! Error types shared by loaders, transports and the cache.

use thiserror::Error;

/// Failure to obtain data from (or deliver data to) the backend.
///
/// Cloneable so that every caller sharing one in-flight load observes the
/// same error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The backend could not be reached.
    #[error("network failure: {0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body, if any.
        message: String,
    },

    /// The response body did not match any known shape.
    #[error("malformed response: {0}")]
    Decode(String),

    /// The load was cancelled after exceeding its time budget.
    #[error("request timed out")]
    Timeout,

    /// The transport has no route for the requested operation.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

impl FetchError {
    /// Returns the HTTP status when the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A query key violated its invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// Pages are 1-based.
    #[error("page must be at least 1")]
    ZeroPage,

    /// Page size must be positive.
    #[error("page size must be greater than 0")]
    ZeroLimit,

    /// Resource names cannot be empty.
    #[error("resource name is empty")]
    EmptyResource,
}
