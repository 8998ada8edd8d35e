//! Outcome types returned by the synthesis client.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use time::OffsetDateTime;

use super::error::SynthesisError;

/// Success-or-failure value of one synthesis call. Never an `Err`.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisResult {
    Success {
        audio_base64: String,
        produced_at: OffsetDateTime,
    },
    Failure {
        reason: SynthesisError,
    },
}

impl SynthesisResult {
    pub fn success(audio_base64: String) -> Self {
        Self::Success {
            audio_base64,
            produced_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn failure(reason: SynthesisError) -> Self {
        Self::Failure { reason }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn audio_base64(&self) -> Option<&str> {
        match self {
            Self::Success { audio_base64, .. } => Some(audio_base64),
            Self::Failure { .. } => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&SynthesisError> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { reason } => Some(reason),
        }
    }

    /// Decode the base64 payload into raw audio bytes.
    pub fn decode_audio(&self) -> Result<Vec<u8>, SynthesisError> {
        match self {
            Self::Success { audio_base64, .. } => BASE64
                .decode(audio_base64)
                .map_err(|e| SynthesisError::MalformedResponse(format!("Base64 decode error: {e}"))),
            Self::Failure { reason } => Err(reason.clone()),
        }
    }

    /// Convert into a `Result` for callers that prefer `?`.
    pub fn into_result(self) -> Result<String, SynthesisError> {
        match self {
            Self::Success { audio_base64, .. } => Ok(audio_base64),
            Self::Failure { reason } => Err(reason),
        }
    }
}

/// A [`SynthesisResult`] plus how many transport attempts it took.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisOutcome {
    pub result: SynthesisResult,
    /// Zero when validation failed before any network call.
    pub attempts: u32,
}
