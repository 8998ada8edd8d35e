//! Serial playback arbiter.
//!
//! # Concurrency Model
//!
//! - One `parking_lot::Mutex` guards the slot, the queue and the drain flag.
//!   It is never held across an `.await`; every check and its matching update
//!   happen under the same lock acquisition.
//! - Every started playback gets a lease. Completion only clears the slot
//!   while the lease still owns it, so a stopped or retriggered playback that
//!   finishes late cannot clear a newer one.
//! - Queued actions run on a spawned drain task, one at a time.

use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{broadcast, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Capacity of the stop notification channel.
const STOP_CHANNEL_CAPACITY: usize = 64;

/// Errors surfaced by [`PlaybackArbiter::request_play`].
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The action of an immediately started playback failed.
    #[error(transparent)]
    ActionFailed(#[from] anyhow::Error),

    /// The request was waiting in the queue when the queue was cleared.
    #[error("Queued playback was discarded before it started")]
    Discarded,
}

/// Broadcast when a playback is told to halt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopNotice {
    pub identity: String,
}

/// Handed to every playback action.
#[derive(Debug, Clone)]
pub struct PlaybackContext {
    identity: String,
    cancel: CancellationToken,
}

impl PlaybackContext {
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Cancelled when this playback is stopped or retriggered.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once this playback has been stopped.
    pub async fn stopped(&self) {
        self.cancel.cancelled().await
    }
}

type BoxedAction = Box<dyn FnOnce(PlaybackContext) -> BoxFuture<'static, anyhow::Result<()>> + Send>;

struct ActivePlayback {
    identity: String,
    lease: u64,
    cancel: CancellationToken,
}

struct QueuedPlayback {
    identity: String,
    action: BoxedAction,
    done: oneshot::Sender<()>,
}

#[derive(Default)]
struct ArbiterState {
    current: Option<ActivePlayback>,
    queue: VecDeque<QueuedPlayback>,
    draining: bool,
    next_lease: u64,
}

impl ArbiterState {
    fn start(&mut self, identity: String) -> (u64, CancellationToken) {
        self.next_lease += 1;
        let lease = self.next_lease;
        let cancel = CancellationToken::new();
        self.current = Some(ActivePlayback {
            identity,
            lease,
            cancel: cancel.clone(),
        });
        (lease, cancel)
    }

    fn release(&mut self, lease: u64) -> bool {
        if self.current.as_ref().is_some_and(|c| c.lease == lease) {
            self.current = None;
            true
        } else {
            false
        }
    }
}

struct ArbiterInner {
    state: Mutex<ArbiterState>,
    stop_tx: broadcast::Sender<StopNotice>,
}

enum Admission<F> {
    Start {
        lease: u64,
        cancel: CancellationToken,
        action: F,
    },
    Queued(oneshot::Receiver<()>),
}

/// Guarantees at most one audio identity plays at a time.
///
/// Cheap to clone; clones share the same state. Construct one at application
/// start and hand clones to every playback call site.
///
/// # Example
///
/// ```rust,no_run
/// use voicechat::core::playback::PlaybackArbiter;
///
/// # async fn example() -> anyhow::Result<()> {
/// let arbiter = PlaybackArbiter::new();
/// arbiter
///     .request_play("message-42", |ctx| async move {
///         tokio::select! {
///             _ = ctx.stopped() => {}
///             _ = tokio::time::sleep(std::time::Duration::from_secs(2)) => {}
///         }
///         Ok(())
///     })
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PlaybackArbiter {
    inner: Arc<ArbiterInner>,
}

impl Default for PlaybackArbiter {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackArbiter {
    pub fn new() -> Self {
        let (stop_tx, _) = broadcast::channel(STOP_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(ArbiterInner {
                state: Mutex::new(ArbiterState::default()),
                stop_tx,
            }),
        }
    }

    /// Subscribe to stop notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StopNotice> {
        self.inner.stop_tx.subscribe()
    }

    /// Play `identity` now, or after everything queued ahead of it.
    ///
    /// - Nothing playing: the action runs immediately and its error is returned.
    /// - Same identity already playing: that playback is stopped (one
    ///   [`StopNotice`]) and the action runs immediately.
    /// - Another identity playing: the request is queued in arrival order.
    ///   The returned future resolves once the action has run; an action
    ///   failure is logged and NOT returned.
    pub async fn request_play<F, Fut>(
        &self,
        identity: impl Into<String>,
        action: F,
    ) -> Result<(), PlaybackError>
    where
        F: FnOnce(PlaybackContext) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let identity = identity.into();

        let admission = {
            let mut state = self.inner.state.lock();
            let playing = state.current.as_ref().map(|c| c.identity.clone());
            match playing {
                Some(playing) if playing == identity => {
                    info!(identity = %identity, "Retriggering current playback");
                    if let Some(stopped) = state.current.take() {
                        self.notify_stop(stopped);
                    }
                    let (lease, cancel) = state.start(identity.clone());
                    Admission::Start {
                        lease,
                        cancel,
                        action,
                    }
                }
                Some(playing) => {
                    let (done, rx) = oneshot::channel();
                    debug!(
                        identity = %identity,
                        playing = %playing,
                        queue_len = state.queue.len() + 1,
                        "Queueing playback"
                    );
                    state.queue.push_back(QueuedPlayback {
                        identity: identity.clone(),
                        action: Box::new(move |ctx| action(ctx).boxed()),
                        done,
                    });
                    Admission::Queued(rx)
                }
                None => {
                    let (lease, cancel) = state.start(identity.clone());
                    Admission::Start {
                        lease,
                        cancel,
                        action,
                    }
                }
            }
        };

        match admission {
            Admission::Start {
                lease,
                cancel,
                action,
            } => {
                debug!(identity = %identity, lease, "Starting playback");
                // Releases the slot even if this future is dropped mid-action.
                let _guard = LeaseGuard {
                    arbiter: self.clone(),
                    lease,
                };
                action(PlaybackContext { identity, cancel })
                    .await
                    .map_err(PlaybackError::ActionFailed)
            }
            Admission::Queued(rx) => rx.await.map_err(|_| PlaybackError::Discarded),
        }
    }

    /// Signal the current playback to halt and free the slot. The queue is untouched.
    ///
    /// Returns the identity that was stopped, if any.
    pub fn stop_current(&self) -> Option<String> {
        let stopped = self.inner.state.lock().current.take()?;
        let identity = stopped.identity.clone();
        info!(identity = %identity, "Stopping current playback");
        self.notify_stop(stopped);
        Some(identity)
    }

    /// Report that `identity` finished playing on its own.
    ///
    /// No-op unless `identity` is the one currently playing.
    pub fn on_play_ended(&self, identity: &str) {
        let ended = {
            let mut state = self.inner.state.lock();
            if state.current.as_ref().is_some_and(|c| c.identity == identity) {
                state.current = None;
                true
            } else {
                false
            }
        };

        if ended {
            debug!(identity = %identity, "Playback ended");
            self.schedule_drain();
        }
    }

    pub fn is_playing(&self, identity: &str) -> bool {
        self.inner
            .state
            .lock()
            .current
            .as_ref()
            .is_some_and(|c| c.identity == identity)
    }

    pub fn currently_playing(&self) -> Option<String> {
        self.inner
            .state
            .lock()
            .current
            .as_ref()
            .map(|c| c.identity.clone())
    }

    /// Drop every queued request. Their callers resolve with [`PlaybackError::Discarded`].
    pub fn clear_queue(&self) -> usize {
        let dropped: Vec<QueuedPlayback> = self.inner.state.lock().queue.drain(..).collect();
        if !dropped.is_empty() {
            info!(count = dropped.len(), "Cleared playback queue");
        }
        dropped.len()
    }

    pub fn queue_len(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    fn notify_stop(&self, stopped: ActivePlayback) {
        stopped.cancel.cancel();
        // No subscribers is fine; the cancellation token still reaches the action.
        let _ = self.inner.stop_tx.send(StopNotice {
            identity: stopped.identity,
        });
    }

    /// Called when an immediately started playback completes.
    fn finish(&self, lease: u64) {
        let released = self.inner.state.lock().release(lease);
        if !released {
            debug!(lease, "Playback finished after losing its slot");
        }
        self.schedule_drain();
    }

    /// Spawn a drain task unless one is running or there is nothing to do.
    fn schedule_drain(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.draining || state.current.is_some() || state.queue.is_empty() {
                return;
            }
            state.draining = true;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let arbiter = self.clone();
                handle.spawn(async move { arbiter.drain_queue().await });
            }
            Err(_) => {
                warn!("No tokio runtime available to drain the playback queue");
                self.inner.state.lock().draining = false;
            }
        }
    }

    async fn drain_queue(&self) {
        loop {
            let (next, lease, cancel) = {
                let mut state = self.inner.state.lock();
                if state.current.is_some() {
                    state.draining = false;
                    return;
                }
                let Some(next) = state.queue.pop_front() else {
                    state.draining = false;
                    return;
                };
                let (lease, cancel) = state.start(next.identity.clone());
                (next, lease, cancel)
            };

            let QueuedPlayback {
                identity,
                action,
                done,
            } = next;
            debug!(identity = %identity, lease, "Starting queued playback");

            let ctx = PlaybackContext {
                identity: identity.clone(),
                cancel,
            };
            match AssertUnwindSafe(action(ctx)).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(identity = %identity, error = %e, "Queued playback failed");
                }
                Err(_) => {
                    warn!(identity = %identity, "Queued playback panicked");
                }
            }

            self.inner.state.lock().release(lease);
            // The caller may have stopped waiting.
            let _ = done.send(());
        }
    }
}

impl std::fmt::Debug for PlaybackArbiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("PlaybackArbiter")
            .field(
                "currently_playing",
                &state.current.as_ref().map(|c| c.identity.as_str()),
            )
            .field("queue_len", &state.queue.len())
            .field("draining", &state.draining)
            .finish()
    }
}

struct LeaseGuard {
    arbiter: PlaybackArbiter,
    lease: u64,
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        self.arbiter.finish(self.lease);
    }
}
