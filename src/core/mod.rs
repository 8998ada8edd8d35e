pub mod chat;
pub mod playback;
pub mod tts;
