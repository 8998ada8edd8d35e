//! Serialized audio playback.
//!
//! A single [`PlaybackArbiter`] is shared by every part of the client that
//! plays audio. It guarantees that at most one audio identity is playing at
//! any moment and that requests arriving while something plays are served
//! in arrival order.
//!
//! # Features
//!
//! - Immediate play when idle; errors from that action propagate to the caller
//! - Retrigger: requesting the identity already playing stops it and restarts
//! - FIFO queue for other identities; queued failures are logged, not returned
//! - Stop notifications over a broadcast channel plus a per-playback
//!   cancellation token

mod arbiter;

#[cfg(test)]
mod tests;

pub use arbiter::{PlaybackArbiter, PlaybackContext, PlaybackError, StopNotice};
