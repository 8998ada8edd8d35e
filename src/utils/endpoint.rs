//! Endpoint URL validation.
//!
//! Configured endpoints must:
//! - Parse as absolute URLs
//! - Use `http` or `https`
//! - Name a host

use thiserror::Error;
use tracing::warn;
use url::Url;

/// Errors that can occur during endpoint validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EndpointError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(#[from] url::ParseError),

    #[error("URL scheme must be http or https, got: {0}")]
    UnsupportedScheme(String),

    #[error("URL must have a host")]
    MissingHost,
}

/// Validate an endpoint URL and return it parsed.
///
/// Plain `http` is accepted (local proxies and mock servers) but logged.
pub fn validate_endpoint(raw: &str) -> Result<Url, EndpointError> {
    let url = Url::parse(raw.trim())?;

    match url.scheme() {
        "https" => {}
        "http" => {
            warn!(endpoint = %url, "Endpoint uses plain http");
        }
        other => return Err(EndpointError::UnsupportedScheme(other.to_string())),
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(EndpointError::MissingHost);
    }

    Ok(url)
}

/// Append `path` to `base`, keeping any path prefix already on `base`.
///
/// `https://api.example.com/v1` + `chat/completions` gives
/// `https://api.example.com/v1/chat/completions`.
pub fn join_endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
