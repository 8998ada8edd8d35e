//! Chat completion client.

use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::config::ChatConfig;
use super::messages::{ApiErrorResponse, ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
use crate::utils::join_endpoint;

const COMPLETIONS_PATH: &str = "chat/completions";

/// Errors returned by [`ChatClient::complete`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("Chat API key is not configured")]
    NotConfigured,

    #[error("Chat request rejected as unauthorized: {0}")]
    Unauthorized(String),

    #[error("Chat rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Chat server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Chat request failed ({status}): {message}")]
    Http { status: u16, message: String },

    #[error("Chat request timed out")]
    Timeout,

    #[error("Chat network error: {0}")]
    Network(String),

    #[error("Malformed chat response: {0}")]
    MalformedResponse(String),

    #[error("Chat response contained no choices")]
    EmptyReply,
}

/// Map a non-success status and its body to a [`ChatError`].
pub fn status_error(status: u16, body: &str) -> ChatError {
    let message = serde_json::from_str::<ApiErrorResponse>(body)
        .map(|e| match e.error.error_type {
            Some(kind) => format!("{} ({kind})", e.error.message),
            None => e.error.message,
        })
        .unwrap_or_else(|_| body.trim().to_string());

    match status {
        401 => ChatError::Unauthorized(message),
        429 => ChatError::RateLimited(message),
        500..=599 => ChatError::Server { status, message },
        _ => ChatError::Http { status, message },
    }
}

/// Stateless client for an OpenAI-compatible chat endpoint. No retries.
#[derive(Clone, Debug)]
pub struct ChatClient {
    config: ChatConfig,
    http: Client,
}

impl ChatClient {
    pub fn new(config: ChatConfig) -> Result<Self, ChatError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ChatError::Network(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn is_configured(&self) -> bool {
        self.config.usable_api_key().is_some()
    }

    /// Send one conversation turn and return the assistant's reply.
    ///
    /// A blank `system_prompt` is omitted. `temperature` falls back to the
    /// configured default.
    pub async fn complete(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
        temperature: Option<f32>,
    ) -> Result<ChatMessage, ChatError> {
        let api_key = self.config.usable_api_key().ok_or(ChatError::NotConfigured)?;

        let system = ChatMessage::system(system_prompt);
        let mut messages = Vec::with_capacity(history.len() + 1);
        if !system_prompt.trim().is_empty() {
            messages.push(&system);
        }
        messages.extend(history.iter());

        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature: temperature.unwrap_or(self.config.temperature),
            stream: false,
        };

        let url = join_endpoint(&self.config.endpoint, COMPLETIONS_PATH);
        debug!(
            url = %url,
            model = %self.config.model,
            turns = history.len(),
            "Chat completion request"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChatError::Timeout
                } else {
                    ChatError::Network(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ChatError::Network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let error = status_error(status.as_u16(), &body);
            warn!(status = status.as_u16(), error = %error, "Chat completion failed");
            return Err(error);
        }

        let parsed: ChatCompletionResponse =
            serde_json::from_str(&body).map_err(|e| ChatError::MalformedResponse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(ChatError::EmptyReply)?
            .message
            .content
            .unwrap_or_default();

        info!(reply_len = content.len(), "Chat completion received");
        Ok(ChatMessage::assistant(content))
    }
}
