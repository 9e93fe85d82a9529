use corral_core::{FetchError, KeyError};
use smol_str::SmolStr;
use thiserror::Error;

/// Error returned by cache reads and loads.
///
/// Cloneable: one failed load is reported to every caller that shared it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The loader failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The slot holds a value of another type than the one requested.
    #[error("cached value for `{key}` is not a `{expected}`")]
    TypeMismatch {
        /// Display form of the query key.
        key: SmolStr,
        /// Requested type name.
        expected: &'static str,
    },

    /// A query key could not be built.
    #[error(transparent)]
    Key(#[from] KeyError),
}

impl CacheError {
    /// The underlying fetch failure, if that is what this is.
    pub fn as_fetch(&self) -> Option<&FetchError> {
        match self {
            CacheError::Fetch(err) => Some(err),
            _ => None,
        }
    }
}

/// Error returned by the mutation gateway.
///
/// None of these variants touch cached state.
#[derive(Debug, Error)]
pub enum MutationError {
    /// The payload failed validation; nothing was sent.
    #[error("invalid input: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// The backend answered `success: false`.
    #[error("{message}")]
    Rejected {
        /// Message from the backend.
        message: String,
    },

    /// The request did not get a usable reply.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The payload could not be encoded.
    #[error("payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl MutationError {
    /// Message suitable for a toast or banner.
    pub fn user_message(&self) -> String {
        match self {
            MutationError::Validation(errors) => {
                let mut fields: Vec<String> = errors
                    .field_errors()
                    .into_keys()
                    .map(|field| field.to_string())
                    .collect();
                fields.sort_unstable();
                format!("Please check: {}", fields.join(", "))
            }
            MutationError::Rejected { message } => message.clone(),
            MutationError::Fetch(FetchError::Status { message, .. }) if !message.is_empty() => {
                message.clone()
            }
            other => other.to_string(),
        }
    }
}
