//! Client construction errors and mapping of transport failures.

use corral_core::FetchError;
use reqwest::StatusCode;
use serde::Deserialize;
use smol_str::SmolStr;
use thiserror::Error;

/// A [`RestClient`](crate::RestClient) could not be built.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The base URL is not an absolute `http(s)` URL.
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),

    /// A route does not start with `/`.
    #[error("route {path} of {resource} must start with '/'")]
    InvalidRoute {
        /// Resource owning the route.
        resource: SmolStr,
        /// Offending path.
        path: String,
    },

    /// The underlying HTTP client failed to initialize.
    #[error("http client: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Maps a failed send to the network or timeout variant.
pub(crate) fn send_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(err.to_string())
    }
}

/// Builds the error of a non-2xx reply, preferring the body's `message`.
pub(crate) fn status_error(status: StatusCode, body: &[u8]) -> FetchError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_owned());
    FetchError::Status {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn message_comes_from_body_when_present() {
        let err = status_error(StatusCode::CONFLICT, br#"{"success":false,"message":"Email already exists"}"#);
        assert_eq!(
            err,
            FetchError::Status {
                status: 409,
                message: "Email already exists".into()
            }
        );
    }

    #[test]
    fn reason_phrase_is_the_fallback() {
        let err = status_error(StatusCode::BAD_GATEWAY, b"<html>upstream down</html>");
        assert_eq!(err.status(), Some(502));
        assert_eq!(err.to_string(), "backend returned 502: Bad Gateway");
    }
}
