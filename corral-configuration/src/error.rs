use std::path::PathBuf;

use smol_str::SmolStr;
use thiserror::Error;

/// Errors of loading or validating a dashboard configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The YAML is malformed or has the wrong shape.
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_saphyr::Error),

    /// `api.base_url` is not an absolute `http(s)` URL.
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),

    /// A page size of zero.
    #[error("page size of {scope} must be greater than 0")]
    InvalidPageSize {
        /// `defaults` or the resource name.
        scope: SmolStr,
    },

    /// A route that does not start with `/`.
    #[error("route {path} of {resource} must start with '/'")]
    InvalidPath {
        /// Resource owning the route.
        resource: SmolStr,
        /// Offending path.
        path: String,
    },

    /// An enabled policy expiring before it turns stale.
    #[error("policy of {scope} expires before it turns stale")]
    InvalidPolicy {
        /// `defaults` or the resource name.
        scope: SmolStr,
    },

    /// `invalidates` names a resource that is not configured.
    #[error("{resource} invalidates unknown resource {dependent}")]
    UnknownDependent {
        /// Resource declaring the dependency.
        resource: SmolStr,
        /// Unknown name.
        dependent: SmolStr,
    },

    /// The REST client could not be built.
    #[error(transparent)]
    Client(#[from] corral_reqwest::ClientError),
}
