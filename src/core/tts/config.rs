//! Configuration types for the speech-synthesis endpoint.
//!
//! This module contains:
//! - Audio encoding selection and the documented default audio parameters
//! - Per-request parameter overrides merged over those defaults
//! - The immutable [`SynthesisRequest`] and its builder
//! - Client-level settings (endpoint, credentials, timeout, retry policy)

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default synthesis endpoint (unidirectional HTTP streaming API).
pub const DEFAULT_TTS_ENDPOINT: &str = "https://openspeech.bytedance.com/api/v3/tts/unidirectional";

/// Default resource identifier sent with every request.
pub const DEFAULT_RESOURCE_ID: &str = "volc.service_type.10029";

/// Default speaker voice.
pub const DEFAULT_SPEAKER: &str = "zh_female_cancan_mars_bigtts";

/// Default user id placed in the request body.
pub const DEFAULT_USER_ID: &str = "voicechat";

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

// =============================================================================
// Audio Format
// =============================================================================

/// Audio encodings the endpoint can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AudioFormat {
    /// MPEG layer 3
    #[default]
    #[serde(rename = "mp3")]
    Mp3,
    /// Opus in an Ogg container
    #[serde(rename = "ogg_opus")]
    OggOpus,
    /// Raw 16-bit little-endian PCM
    #[serde(rename = "pcm")]
    Pcm,
}

impl AudioFormat {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::OggOpus => "ogg_opus",
            Self::Pcm => "pcm",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "mp3" | "mpeg" => Self::Mp3,
            "ogg_opus" | "opus" | "ogg" => Self::OggOpus,
            "pcm" | "linear16" | "pcm16" => Self::Pcm,
            _ => Self::default(),
        }
    }

    /// File extension for saved audio.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::OggOpus => "ogg",
            Self::Pcm => "pcm",
        }
    }

    /// MIME type of the decoded payload.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::OggOpus => "audio/ogg",
            Self::Pcm => "audio/pcm",
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Audio Parameters
// =============================================================================

/// Fully resolved audio parameters, serialized as `audio_params` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioParams {
    pub format: AudioFormat,
    pub sample_rate: u32,
    pub bit_rate: u32,
    /// Omitted from the body when unset, leaving the voice's own default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion_scale: Option<f32>,
    /// Speech rate offset, 0 is normal speed.
    pub speech_rate: i32,
    /// Loudness offset, 0 is normal volume.
    pub loudness_rate: i32,
    pub enable_timestamp: bool,
}

impl Default for AudioParams {
    fn default() -> Self {
        Self {
            format: AudioFormat::Mp3,
            sample_rate: 24_000,
            bit_rate: 64_000,
            emotion: None,
            emotion_scale: None,
            speech_rate: 0,
            loudness_rate: 0,
            enable_timestamp: false,
        }
    }
}

/// Caller-supplied audio parameters. Unset fields keep the defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AudioParamsOverride {
    pub format: Option<AudioFormat>,
    pub sample_rate: Option<u32>,
    pub bit_rate: Option<u32>,
    pub emotion: Option<String>,
    pub emotion_scale: Option<f32>,
    pub speech_rate: Option<i32>,
    pub loudness_rate: Option<i32>,
    pub enable_timestamp: Option<bool>,
}

impl AudioParamsOverride {
    /// Merge these overrides over `base`.
    pub fn apply_to(&self, base: AudioParams) -> AudioParams {
        AudioParams {
            format: self.format.unwrap_or(base.format),
            sample_rate: self.sample_rate.unwrap_or(base.sample_rate),
            bit_rate: self.bit_rate.unwrap_or(base.bit_rate),
            emotion: self.emotion.clone().or(base.emotion),
            emotion_scale: self.emotion_scale.or(base.emotion_scale),
            speech_rate: self.speech_rate.unwrap_or(base.speech_rate),
            loudness_rate: self.loudness_rate.unwrap_or(base.loudness_rate),
            enable_timestamp: self.enable_timestamp.unwrap_or(base.enable_timestamp),
        }
    }
}

// =============================================================================
// Synthesis Request
// =============================================================================

/// One synthesis job. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    text: String,
    speaker: String,
    audio_params: AudioParams,
}

impl SynthesisRequest {
    /// Start building a request for `text`.
    pub fn builder(text: impl Into<String>) -> SynthesisRequestBuilder {
        SynthesisRequestBuilder {
            text: text.into(),
            speaker: None,
            overrides: AudioParamsOverride::default(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn speaker(&self) -> &str {
        &self.speaker
    }

    pub fn audio_params(&self) -> &AudioParams {
        &self.audio_params
    }
}

/// Builder for [`SynthesisRequest`].
#[derive(Debug, Clone)]
pub struct SynthesisRequestBuilder {
    text: String,
    speaker: Option<String>,
    overrides: AudioParamsOverride,
}

impl SynthesisRequestBuilder {
    pub fn speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = Some(speaker.into());
        self
    }

    pub fn audio_params(mut self, overrides: AudioParamsOverride) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn format(mut self, format: AudioFormat) -> Self {
        self.overrides.format = Some(format);
        self
    }

    pub fn emotion(mut self, emotion: impl Into<String>, scale: Option<f32>) -> Self {
        self.overrides.emotion = Some(emotion.into());
        self.overrides.emotion_scale = scale;
        self
    }

    pub fn speech_rate(mut self, rate: i32) -> Self {
        self.overrides.speech_rate = Some(rate);
        self
    }

    /// Finish the request. An unset speaker falls back to [`DEFAULT_SPEAKER`].
    pub fn build(self) -> SynthesisRequest {
        SynthesisRequest {
            text: self.text,
            speaker: self.speaker.unwrap_or_else(|| DEFAULT_SPEAKER.to_string()),
            audio_params: self.overrides.apply_to(AudioParams::default()),
        }
    }
}

// =============================================================================
// Client Settings
// =============================================================================

/// Credentials required by the synthesis endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub app_id: String,
    pub access_key: String,
}

impl Credentials {
    /// Both fields must be non-blank.
    pub fn is_complete(&self) -> bool {
        !self.app_id.trim().is_empty() && !self.access_key.trim().is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("access_key", &"<redacted>")
            .finish()
    }
}

/// Settings for [`super::SynthesisClient`].
#[derive(Debug, Clone)]
pub struct SynthesisConfig {
    pub endpoint: String,
    /// `None` makes every call fail with `NotConfigured`.
    pub credentials: Option<Credentials>,
    pub resource_id: String,
    pub user_id: String,
    pub default_speaker: String,
    /// Wall-clock limit for one attempt.
    pub timeout: Duration,
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub retry_delay: Duration,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_TTS_ENDPOINT.to_string(),
            credentials: None,
            resource_id: DEFAULT_RESOURCE_ID.to_string(),
            user_id: DEFAULT_USER_ID.to_string(),
            default_speaker: DEFAULT_SPEAKER.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

impl SynthesisConfig {
    /// Credentials, if present and complete.
    pub fn usable_credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref().filter(|c| c.is_complete())
    }
}
