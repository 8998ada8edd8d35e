//! Error taxonomy for the synthesis client.
//!
//! Every failure the client can report is a [`SynthesisError`]. Failures are
//! grouped into an [`ErrorClass`] which decides whether a retry can help.
//! The decision itself lives in [`classify`], a pure function over the raw
//! outcome of one transport attempt, so the retry loop only has to act on it.

use thiserror::Error;

/// Maximum text length accepted by the synthesis endpoint, in characters.
pub const MAX_TEXT_CHARS: usize = 1000;

/// Failure kinds surfaced to callers of the synthesis client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    #[error("Synthesis credentials are not configured")]
    NotConfigured,

    #[error("Text to synthesize is empty")]
    EmptyText,

    #[error("Text is too long: {chars} characters (max {MAX_TEXT_CHARS})")]
    TextTooLong { chars: usize },

    #[error("Synthesis request timed out")]
    Timeout,

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Permission denied: {0}")]
    PermissionError(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Empty response body")]
    EmptyResponse,

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Response carried no audio data")]
    EmptyAudioData,

    #[error("Upstream error {code}: {message}")]
    UpstreamError { code: i64, message: String },

    #[error("Unknown error: {message}")]
    Unknown { message: String },
}

/// Coarse grouping of [`SynthesisError`] used for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad caller input, reported before any network call.
    InputValidation,
    /// Missing or rejected credentials. Terminal for the call.
    Configuration,
    /// Network hiccups, overloaded upstream. Worth another attempt.
    Transient,
    /// The server answered with something structurally wrong or an explicit error.
    Protocol,
}

impl SynthesisError {
    /// The class this failure belongs to.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::EmptyText | Self::TextTooLong { .. } => ErrorClass::InputValidation,
            Self::NotConfigured | Self::AuthError(_) | Self::PermissionError(_) => {
                ErrorClass::Configuration
            }
            Self::Timeout
            | Self::NetworkError(_)
            | Self::ServerError { .. }
            | Self::RateLimited(_)
            | Self::Unknown { .. } => ErrorClass::Transient,
            Self::EmptyResponse
            | Self::MalformedResponse(_)
            | Self::EmptyAudioData
            | Self::UpstreamError { .. } => ErrorClass::Protocol,
        }
    }

    /// Whether another attempt could plausibly succeed.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}

/// Raw outcome of a single failed transport attempt, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    #[error("attempt timed out")]
    Timeout,

    #[error("network failure: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The body arrived but could not be assembled into audio.
    #[error(transparent)]
    Response(SynthesisError),
}

/// Result of [`classify`]: what the failure is and whether to try again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub retry: bool,
    pub kind: SynthesisError,
}

/// Message fragments that mark a credential problem regardless of status.
const AUTH_MARKERS: [&str; 2] = ["invalid", "unauthorized"];

fn mentions_bad_credentials(message: &str) -> bool {
    let lower = message.to_lowercase();
    AUTH_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Map a failed attempt onto the error taxonomy and a retry decision.
pub fn classify(error: &AttemptError) -> Classification {
    let kind = match error {
        AttemptError::Timeout => SynthesisError::Timeout,
        AttemptError::Network(msg) if mentions_bad_credentials(msg) => {
            SynthesisError::AuthError(msg.clone())
        }
        AttemptError::Network(msg) => SynthesisError::NetworkError(msg.clone()),
        AttemptError::Http { status, body } => match *status {
            401 => SynthesisError::AuthError(body.clone()),
            403 => SynthesisError::PermissionError(body.clone()),
            _ if mentions_bad_credentials(body) => SynthesisError::AuthError(body.clone()),
            429 => SynthesisError::RateLimited(body.clone()),
            500..=599 => SynthesisError::ServerError {
                status: *status,
                message: body.clone(),
            },
            _ => SynthesisError::Unknown {
                message: format!("HTTP {status}: {body}"),
            },
        },
        AttemptError::Response(inner) => inner.clone(),
    };

    Classification {
        retry: kind.is_retryable(),
        kind,
    }
}
