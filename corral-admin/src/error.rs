use corral::CacheError;
use corral_configuration::ConfigError;
use corral_core::{FetchError, KeyError};
use thiserror::Error;

/// Error of the dashboard facade.
///
/// Mutations report [`corral::MutationError`] instead, which knows how to
/// phrase itself for the user.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}
