//! Speech-synthesis client.
//!
//! Turns a [`SynthesisRequest`] into a [`SynthesisResult`], hiding transient
//! network failures and the endpoint's non-uniform response format.
//!
//! # Features
//!
//! - Fail-fast validation (blank text, text over 1000 characters, missing credentials)
//! - Per-attempt wall-clock timeout (default 30s)
//! - Bounded retry (default 3 attempts, 1000ms apart) for transient failures only
//! - Reassembly of newline-delimited fragment streams into one base64 payload
//! - Typed failure taxonomy, returned as values rather than errors
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use voicechat::core::tts::{SynthesisClient, SynthesisConfig, SynthesisRequest};
//!
//! let client = SynthesisClient::new(SynthesisConfig::default())?;
//! let request = SynthesisRequest::builder("你好").speaker("zh_female_test").build();
//! match client.synthesize(&request).await {
//!     SynthesisResult::Success { audio_base64, .. } => { /* play it */ }
//!     SynthesisResult::Failure { reason } => eprintln!("{reason}"),
//! }
//! ```

mod assembly;
mod client;
mod config;
mod error;
mod messages;
mod result;
mod transport;


pub use assembly::{AssembledAudio, assemble_response};
pub use client::{
    HEADER_ACCESS_KEY, HEADER_APP_ID, HEADER_REQUEST_ID, HEADER_RESOURCE_ID, SynthesisClient,
    generate_request_id, validate_text,
};
pub use config::{
    AudioFormat, AudioParams, AudioParamsOverride, Credentials, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_RESOURCE_ID, DEFAULT_RETRY_DELAY_MS, DEFAULT_SPEAKER, DEFAULT_TIMEOUT_MS,
    DEFAULT_TTS_ENDPOINT, DEFAULT_USER_ID, SynthesisConfig, SynthesisRequest,
    SynthesisRequestBuilder,
};
pub use error::{AttemptError, Classification, ErrorClass, MAX_TEXT_CHARS, SynthesisError, classify};
pub use messages::{CODE_OK, CODE_OK_ALT, ResponseFragment, TTS_NAMESPACE};
pub use result::{SynthesisOutcome, SynthesisResult};
pub use transport::{HttpTransport, PreparedCall, RawResponse, SynthesisTransport};
