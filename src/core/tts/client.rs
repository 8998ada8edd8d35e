//! Synthesis client: validation, request construction, bounded retry.
//!
//! # API Reference
//!
//! - Endpoint: `POST {endpoint}` (unidirectional HTTP synthesis)
//! - Headers: `X-Api-App-Id`, `X-Api-Access-Key`, `X-Api-Resource-Id`, `X-Api-Request-Id`
//! - Body: `{user:{uid}, namespace, req_params:{text, speaker, audio_params}}`
//! - Response: one JSON object or newline-delimited fragments (see [`super::assembly`])

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use super::assembly::assemble_response;
use super::config::{Credentials, SynthesisConfig, SynthesisRequest, SynthesisRequestBuilder};
use super::error::{AttemptError, Classification, MAX_TEXT_CHARS, SynthesisError, classify};
use super::messages::{ReqParams, TTS_NAMESPACE, TtsRequestBody, UserInfo};
use super::result::{SynthesisOutcome, SynthesisResult};
use super::transport::{HttpTransport, PreparedCall, SynthesisTransport};

pub const HEADER_APP_ID: &str = "X-Api-App-Id";
pub const HEADER_ACCESS_KEY: &str = "X-Api-Access-Key";
pub const HEADER_RESOURCE_ID: &str = "X-Api-Resource-Id";
pub const HEADER_REQUEST_ID: &str = "X-Api-Request-Id";

/// Generate a request id: unix millis plus a short random suffix.
///
/// Only needs to be unique within a short window.
pub fn generate_request_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{millis}-{}", &suffix[..8])
}

/// Reject blank and oversized text before touching the network.
pub fn validate_text(text: &str) -> Result<(), SynthesisError> {
    if text.trim().is_empty() {
        return Err(SynthesisError::EmptyText);
    }
    let chars = text.chars().count();
    if chars > MAX_TEXT_CHARS {
        return Err(SynthesisError::TextTooLong { chars });
    }
    Ok(())
}

/// Client for the speech-synthesis endpoint.
///
/// [`synthesize`](Self::synthesize) always resolves to a [`SynthesisResult`];
/// callers never handle an `Err`.
///
/// # Example
///
/// ```rust,no_run
/// use voicechat::core::tts::{Credentials, SynthesisClient, SynthesisConfig, SynthesisRequest};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = SynthesisConfig {
///     credentials: Some(Credentials {
///         app_id: "app-id".to_string(),
///         access_key: "access-key".to_string(),
///     }),
///     ..Default::default()
/// };
/// let client = SynthesisClient::new(config)?;
/// let request = SynthesisRequest::builder("Hello there").build();
/// let audio = client.synthesize(&request).await.decode_audio()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SynthesisClient {
    config: SynthesisConfig,
    transport: Arc<dyn SynthesisTransport>,
}

impl SynthesisClient {
    /// Create a client backed by [`HttpTransport`].
    pub fn new(config: SynthesisConfig) -> Result<Self, SynthesisError> {
        let transport = HttpTransport::new().map_err(|e| SynthesisError::Unknown {
            message: format!("Failed to build HTTP client: {e}"),
        })?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client with a custom transport.
    pub fn with_transport(config: SynthesisConfig, transport: Arc<dyn SynthesisTransport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Whether usable credentials are present.
    pub fn is_configured(&self) -> bool {
        self.config.usable_credentials().is_some()
    }

    /// Start a request for `text` using the configured default speaker.
    pub fn request(&self, text: impl Into<String>) -> SynthesisRequestBuilder {
        SynthesisRequest::builder(text).speaker(self.config.default_speaker.clone())
    }

    /// Build headers and body for one attempt. Each call gets a fresh request id.
    pub fn prepare_call(&self, request: &SynthesisRequest, credentials: &Credentials) -> PreparedCall {
        let request_id = generate_request_id();

        let body = TtsRequestBody {
            user: UserInfo {
                uid: &self.config.user_id,
            },
            namespace: TTS_NAMESPACE,
            req_params: ReqParams {
                text: request.text(),
                speaker: request.speaker(),
                audio_params: request.audio_params(),
            },
        };
        // Serializing plain strings and numbers cannot fail.
        let body = serde_json::to_string(&body).unwrap_or_default();

        PreparedCall {
            endpoint: self.config.endpoint.clone(),
            headers: vec![
                ("Content-Type", "application/json".to_string()),
                (HEADER_APP_ID, credentials.app_id.clone()),
                (HEADER_ACCESS_KEY, credentials.access_key.clone()),
                (HEADER_RESOURCE_ID, self.config.resource_id.clone()),
                (HEADER_REQUEST_ID, request_id.clone()),
            ],
            request_id,
            body,
        }
    }

    /// Synthesize `request` into base64 audio.
    pub async fn synthesize(&self, request: &SynthesisRequest) -> SynthesisResult {
        self.synthesize_with_stats(request).await.result
    }

    /// Like [`synthesize`](Self::synthesize), also reporting the attempt count.
    pub async fn synthesize_with_stats(&self, request: &SynthesisRequest) -> SynthesisOutcome {
        if let Err(reason) = validate_text(request.text()) {
            debug!(error = %reason, "Rejecting synthesis request");
            return SynthesisOutcome {
                result: SynthesisResult::failure(reason),
                attempts: 0,
            };
        }

        let Some(credentials) = self.config.usable_credentials() else {
            warn!("Synthesis requested but credentials are not configured");
            return SynthesisOutcome {
                result: SynthesisResult::failure(SynthesisError::NotConfigured),
                attempts: 0,
            };
        };

        let max_attempts = self.config.max_attempts.max(1);
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let call = self.prepare_call(request, credentials);

            debug!(
                request_id = %call.request_id,
                attempt = attempts,
                text_len = request.text().len(),
                speaker = %request.speaker(),
                "Synthesis request"
            );

            match self.attempt(&call).await {
                Ok(audio_base64) => {
                    info!(
                        request_id = %call.request_id,
                        attempts,
                        audio_len = audio_base64.len(),
                        "Synthesis complete"
                    );
                    return SynthesisOutcome {
                        result: SynthesisResult::success(audio_base64),
                        attempts,
                    };
                }
                Err(error) => {
                    let Classification { retry, kind } = classify(&error);

                    if !retry || attempts >= max_attempts {
                        warn!(
                            request_id = %call.request_id,
                            attempts,
                            retryable = retry,
                            error = %kind,
                            "Synthesis failed"
                        );
                        return SynthesisOutcome {
                            result: SynthesisResult::failure(kind),
                            attempts,
                        };
                    }

                    warn!(
                        request_id = %call.request_id,
                        attempt = attempts,
                        max_attempts,
                        delay_ms = self.config.retry_delay.as_millis() as u64,
                        error = %kind,
                        "Retryable synthesis error"
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                }
            }
        }
    }

    /// One bounded attempt. Dropping the transport future on timeout abandons it.
    async fn attempt(&self, call: &PreparedCall) -> Result<String, AttemptError> {
        let raw = tokio::time::timeout(self.config.timeout, self.transport.send(call))
            .await
            .map_err(|_| AttemptError::Timeout)??;

        assemble_response(&raw.body)
            .map(|audio| audio.audio_base64)
            .map_err(AttemptError::Response)
    }
}

impl std::fmt::Debug for SynthesisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesisClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
