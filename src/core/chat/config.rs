//! Chat endpoint configuration.

use std::time::Duration;

pub const DEFAULT_CHAT_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_CHAT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_CHAT_TIMEOUT_SECS: u64 = 60;

/// Settings for an OpenAI-compatible chat endpoint.
#[derive(Clone)]
pub struct ChatConfig {
    /// Base URL; `/chat/completions` is appended.
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_CHAT_ENDPOINT.to_string(),
            api_key: None,
            model: DEFAULT_CHAT_MODEL.to_string(),
            temperature: DEFAULT_CHAT_TEMPERATURE,
            timeout: Duration::from_secs(DEFAULT_CHAT_TIMEOUT_SECS),
        }
    }
}

impl ChatConfig {
    /// The API key, if set and not blank.
    pub fn usable_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

impl std::fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish()
    }
}
