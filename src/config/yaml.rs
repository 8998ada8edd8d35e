use serde::Deserialize;
use std::path::Path;

use super::ConfigError;
use crate::core::tts::AudioParamsOverride;

/// Complete YAML configuration structure
///
/// All fields are optional so a file can override only what it needs.
/// Values here win over environment variables.
///
/// # Example YAML structure
/// ```yaml
/// tts:
///   app_id: "your-app-id"
///   access_key: "your-access-key"
///   resource_id: "volc.service_type.10029"
///   endpoint: "https://openspeech.bytedance.com/api/v3/tts/unidirectional"
///   speaker: "zh_female_cancan_mars_bigtts"
///   user_id: "voicechat"
///   timeout_ms: 30000
///   max_attempts: 3
///   retry_delay_ms: 1000
///   audio:
///     format: "mp3"
///     sample_rate: 24000
///     speech_rate: 10
///
/// chat:
///   api_key: "sk-..."
///   endpoint: "https://api.openai.com/v1"
///   model: "gpt-4o-mini"
///   temperature: 0.7
///   timeout_secs: 60
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub tts: Option<TtsYaml>,
    pub chat: Option<ChatYaml>,
}

/// Speech synthesis settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TtsYaml {
    pub app_id: Option<String>,
    pub access_key: Option<String>,
    pub resource_id: Option<String>,
    pub endpoint: Option<String>,
    pub speaker: Option<String>,
    pub user_id: Option<String>,
    pub timeout_ms: Option<u64>,
    pub max_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    /// Audio parameters applied to every request built by the CLI.
    pub audio: Option<AudioParamsOverride>,
}

/// Chat endpoint settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ChatYaml {
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;

        serde_yaml::from_str(&contents).map_err(ConfigError::ParseYaml)
    }
}
