//! Wire types for the speech-synthesis endpoint.
//!
//! Requests are a single JSON document. Responses are one or more
//! newline-separated JSON objects, each carrying a status code, a message and
//! optionally a base64 chunk of the audio stream.

use serde::{Deserialize, Deserializer, Serialize};

use super::config::AudioParams;

/// Namespace sent with every request.
pub const TTS_NAMESPACE: &str = "BidirectionalTTS";

/// Primary success code.
pub const CODE_OK: i64 = 0;

/// Alternate success code used by the v3 API ("20000000 OK").
pub const CODE_OK_ALT: i64 = 20_000_000;

// =============================================================================
// Request
// =============================================================================

/// Request body for a synthesis call.
#[derive(Debug, Clone, Serialize)]
pub struct TtsRequestBody<'a> {
    pub user: UserInfo<'a>,
    pub namespace: &'static str,
    pub req_params: ReqParams<'a>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserInfo<'a> {
    pub uid: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReqParams<'a> {
    pub text: &'a str,
    pub speaker: &'a str,
    pub audio_params: &'a AudioParams,
}

// =============================================================================
// Response
// =============================================================================

/// One parsed line of a response body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResponseFragment {
    /// Absent or `null` reads as [`CODE_OK`].
    #[serde(default, deserialize_with = "null_as_default")]
    pub code: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    /// Base64 audio chunk. Absent or `null` on status-only fragments.
    #[serde(default)]
    pub data: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ResponseFragment {
    /// `true` for either of the documented success codes.
    #[inline]
    pub fn is_success(&self) -> bool {
        self.code == CODE_OK || self.code == CODE_OK_ALT
    }

    /// Only negative codes are hard failures; other non-success codes are informational.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        !self.is_success() && self.code < 0
    }
}
