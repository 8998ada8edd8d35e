//! Environment variable loading.

use std::str::FromStr;
use std::time::Duration;

use super::ConfigError;
use crate::core::chat::ChatConfig;
use crate::core::tts::{Credentials, SynthesisConfig};

pub const ENV_TTS_APP_ID: &str = "TTS_APP_ID";
pub const ENV_TTS_ACCESS_KEY: &str = "TTS_ACCESS_KEY";
pub const ENV_TTS_RESOURCE_ID: &str = "TTS_RESOURCE_ID";
pub const ENV_TTS_ENDPOINT: &str = "TTS_ENDPOINT";
pub const ENV_TTS_SPEAKER: &str = "TTS_SPEAKER";
pub const ENV_TTS_USER_ID: &str = "TTS_USER_ID";
pub const ENV_TTS_TIMEOUT_MS: &str = "TTS_TIMEOUT_MS";
pub const ENV_TTS_MAX_ATTEMPTS: &str = "TTS_MAX_ATTEMPTS";
pub const ENV_TTS_RETRY_DELAY_MS: &str = "TTS_RETRY_DELAY_MS";
pub const ENV_CHAT_API_KEY: &str = "CHAT_API_KEY";
pub const ENV_CHAT_ENDPOINT: &str = "CHAT_ENDPOINT";
pub const ENV_CHAT_MODEL: &str = "CHAT_MODEL";
pub const ENV_CHAT_TEMPERATURE: &str = "CHAT_TEMPERATURE";

/// Every variable read by [`synthesis_from_env`] and [`chat_from_env`].
pub const ALL_ENV_VARS: &[&str] = &[
    ENV_TTS_APP_ID,
    ENV_TTS_ACCESS_KEY,
    ENV_TTS_RESOURCE_ID,
    ENV_TTS_ENDPOINT,
    ENV_TTS_SPEAKER,
    ENV_TTS_USER_ID,
    ENV_TTS_TIMEOUT_MS,
    ENV_TTS_MAX_ATTEMPTS,
    ENV_TTS_RETRY_DELAY_MS,
    ENV_CHAT_API_KEY,
    ENV_CHAT_ENDPOINT,
    ENV_CHAT_MODEL,
    ENV_CHAT_TEMPERATURE,
];

/// Read a variable, treating unset and blank the same.
pub(crate) fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read and parse a variable.
pub(crate) fn env_parse<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_string(key)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

/// Synthesis settings from the environment over the defaults.
pub(crate) fn synthesis_from_env() -> Result<SynthesisConfig, ConfigError> {
    let mut config = SynthesisConfig::default();

    let app_id = env_string(ENV_TTS_APP_ID);
    let access_key = env_string(ENV_TTS_ACCESS_KEY);
    if app_id.is_some() || access_key.is_some() {
        config.credentials = Some(Credentials {
            app_id: app_id.unwrap_or_default(),
            access_key: access_key.unwrap_or_default(),
        });
    }

    if let Some(resource_id) = env_string(ENV_TTS_RESOURCE_ID) {
        config.resource_id = resource_id;
    }
    if let Some(endpoint) = env_string(ENV_TTS_ENDPOINT) {
        config.endpoint = endpoint;
    }
    if let Some(speaker) = env_string(ENV_TTS_SPEAKER) {
        config.default_speaker = speaker;
    }
    if let Some(user_id) = env_string(ENV_TTS_USER_ID) {
        config.user_id = user_id;
    }
    if let Some(ms) = env_parse::<u64>(ENV_TTS_TIMEOUT_MS)? {
        config.timeout = Duration::from_millis(ms);
    }
    if let Some(attempts) = env_parse::<u32>(ENV_TTS_MAX_ATTEMPTS)? {
        config.max_attempts = attempts;
    }
    if let Some(ms) = env_parse::<u64>(ENV_TTS_RETRY_DELAY_MS)? {
        config.retry_delay = Duration::from_millis(ms);
    }

    Ok(config)
}

/// Chat settings from the environment over the defaults.
pub(crate) fn chat_from_env() -> Result<ChatConfig, ConfigError> {
    let mut config = ChatConfig {
        api_key: env_string(ENV_CHAT_API_KEY),
        ..Default::default()
    };

    if let Some(endpoint) = env_string(ENV_CHAT_ENDPOINT) {
        config.endpoint = endpoint;
    }
    if let Some(model) = env_string(ENV_CHAT_MODEL) {
        config.model = model;
    }
    if let Some(temperature) = env_parse::<f32>(ENV_CHAT_TEMPERATURE)? {
        config.temperature = temperature;
    }

    Ok(config)
}
