//! Configuration module for the voicechat client
//!
//! Settings come from `.env` files, environment variables and an optional
//! YAML file. Priority: YAML > ENV vars > .env values > defaults.
//!
//! Missing credentials are not a load error. The synthesis and chat clients
//! report them as `NotConfigured` when called.
//!
//! # Example
//! ```rust,no_run
//! use voicechat::config::ClientConfig;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ClientConfig::from_env()?;
//!
//! // Load from YAML file with environment variables as the base
//! let config = ClientConfig::from_file(Path::new("config.yaml"))?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

mod env;
mod yaml;

pub use env::{
    ALL_ENV_VARS, ENV_CHAT_API_KEY, ENV_CHAT_ENDPOINT, ENV_CHAT_MODEL, ENV_CHAT_TEMPERATURE,
    ENV_TTS_ACCESS_KEY, ENV_TTS_APP_ID, ENV_TTS_ENDPOINT, ENV_TTS_MAX_ATTEMPTS,
    ENV_TTS_RESOURCE_ID, ENV_TTS_RETRY_DELAY_MS, ENV_TTS_SPEAKER, ENV_TTS_TIMEOUT_MS,
    ENV_TTS_USER_ID,
};
pub use yaml::{ChatYaml, TtsYaml, YamlConfig};

use crate::core::chat::ChatConfig;
use crate::core::tts::{AudioParamsOverride, Credentials, SynthesisConfig};
use crate::utils::{EndpointError, validate_endpoint};

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML: {0}")]
    ParseYaml(#[source] serde_yaml::Error),

    #[error("Invalid value for {key} ({value}): {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Invalid {name} endpoint: {source}")]
    InvalidEndpoint {
        name: &'static str,
        #[source]
        source: EndpointError,
    },
}

/// Client configuration
///
/// Holds everything the CLI needs to build a synthesis client and a chat client.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub synthesis: SynthesisConfig,
    pub chat: ChatConfig,
    /// Audio parameters applied to every synthesis request built from this config.
    pub audio: AudioParamsOverride,
}

impl ClientConfig {
    /// Load configuration from environment variables
    ///
    /// `.env` is loaded by `main` before this runs, so its values show up
    /// here as ordinary environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            synthesis: env::synthesis_from_env()?,
            chat: env::chat_from_env()?,
            audio: AudioParamsOverride::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file, with environment variables as the base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml = YamlConfig::from_file(path)?;

        let mut config = Self {
            synthesis: env::synthesis_from_env()?,
            chat: env::chat_from_env()?,
            audio: AudioParamsOverride::default(),
        };
        config.apply_yaml(yaml);
        config.validate()?;
        Ok(config)
    }

    /// Overlay YAML values onto this configuration.
    pub fn apply_yaml(&mut self, yaml: YamlConfig) {
        if let Some(tts) = yaml.tts {
            let synthesis = &mut self.synthesis;

            if tts.app_id.is_some() || tts.access_key.is_some() {
                let base = synthesis.credentials.take().unwrap_or(Credentials {
                    app_id: String::new(),
                    access_key: String::new(),
                });
                synthesis.credentials = Some(Credentials {
                    app_id: tts.app_id.unwrap_or(base.app_id),
                    access_key: tts.access_key.unwrap_or(base.access_key),
                });
            }
            if let Some(resource_id) = tts.resource_id {
                synthesis.resource_id = resource_id;
            }
            if let Some(endpoint) = tts.endpoint {
                synthesis.endpoint = endpoint;
            }
            if let Some(speaker) = tts.speaker {
                synthesis.default_speaker = speaker;
            }
            if let Some(user_id) = tts.user_id {
                synthesis.user_id = user_id;
            }
            if let Some(ms) = tts.timeout_ms {
                synthesis.timeout = Duration::from_millis(ms);
            }
            if let Some(attempts) = tts.max_attempts {
                synthesis.max_attempts = attempts;
            }
            if let Some(ms) = tts.retry_delay_ms {
                synthesis.retry_delay = Duration::from_millis(ms);
            }
            if let Some(audio) = tts.audio {
                self.audio = audio;
            }
        }

        if let Some(chat) = yaml.chat {
            if chat.api_key.is_some() {
                self.chat.api_key = chat.api_key;
            }
            if let Some(endpoint) = chat.endpoint {
                self.chat.endpoint = endpoint;
            }
            if let Some(model) = chat.model {
                self.chat.model = model;
            }
            if let Some(temperature) = chat.temperature {
                self.chat.temperature = temperature;
            }
            if let Some(secs) = chat.timeout_secs {
                self.chat.timeout = Duration::from_secs(secs);
            }
        }
    }

    /// Check endpoints and numeric ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_endpoint(&self.synthesis.endpoint).map_err(|source| {
            ConfigError::InvalidEndpoint {
                name: "synthesis",
                source,
            }
        })?;
        validate_endpoint(&self.chat.endpoint).map_err(|source| ConfigError::InvalidEndpoint {
            name: "chat",
            source,
        })?;

        if self.synthesis.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_attempts".to_string(),
                value: "0".to_string(),
                reason: "at least one attempt is required".to_string(),
            });
        }
        if self.synthesis.timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "timeout_ms".to_string(),
                value: "0".to_string(),
                reason: "timeout must be positive".to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.chat.temperature) {
            return Err(ConfigError::InvalidValue {
                key: "temperature".to_string(),
                value: self.chat.temperature.to_string(),
                reason: "must be between 0 and 2".to_string(),
            });
        }

        Ok(())
    }
}
