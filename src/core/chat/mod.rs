//! Chat endpoint client.
//!
//! A thin, stateless client for OpenAI-compatible `/chat/completions`
//! endpoints. Conversation history is owned by the caller.

mod client;
mod config;
mod messages;

pub use client::{ChatClient, ChatError, status_error};
pub use config::{
    ChatConfig, DEFAULT_CHAT_ENDPOINT, DEFAULT_CHAT_MODEL, DEFAULT_CHAT_TEMPERATURE,
    DEFAULT_CHAT_TIMEOUT_SECS,
};
pub use messages::{ChatMessage, ChatRole};
