pub mod config;
pub mod core;
pub mod utils;

// Re-export commonly used items for convenience
pub use config::{ClientConfig, ConfigError};
pub use core::chat::{ChatClient, ChatError, ChatMessage, ChatRole};
pub use core::playback::{PlaybackArbiter, PlaybackContext, PlaybackError, StopNotice};
pub use core::tts::{SynthesisClient, SynthesisError, SynthesisRequest, SynthesisResult};
