//! Tests for the playback arbiter.
//!
//! All tests run on tokio's paused clock so action durations are exact and
//! queued work is driven by the runtime's auto-advance.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::*;

// =============================================================================
// Helpers
// =============================================================================

/// Records what ran and checks that every other live action was already stopped.
#[derive(Default)]
struct Monitor {
    live: Mutex<Vec<(usize, String, CancellationToken)>>,
    next_id: Mutex<usize>,
    started: Mutex<Vec<String>>,
    overlaps: Mutex<Vec<(String, String)>>,
}

impl Monitor {
    fn enter(&self, ctx: &PlaybackContext) -> usize {
        let id = {
            let mut next = self.next_id.lock();
            *next += 1;
            *next
        };
        let mut live = self.live.lock();
        for (_, other, token) in live.iter() {
            if !token.is_cancelled() {
                self.overlaps
                    .lock()
                    .push((other.clone(), ctx.identity().to_string()));
            }
        }
        live.push((id, ctx.identity().to_string(), ctx.cancellation().clone()));
        self.started.lock().push(ctx.identity().to_string());
        id
    }

    fn leave(&self, id: usize) {
        self.live.lock().retain(|(live_id, _, _)| *live_id != id);
    }

    fn started(&self) -> Vec<String> {
        self.started.lock().clone()
    }

    fn overlaps(&self) -> Vec<(String, String)> {
        self.overlaps.lock().clone()
    }
}

/// An action that plays for `duration` or until stopped.
fn timed(
    monitor: Arc<Monitor>,
    duration: Duration,
) -> impl FnOnce(PlaybackContext) -> BoxFuture<'static, anyhow::Result<()>> + Send + 'static {
    move |ctx: PlaybackContext| -> BoxFuture<'static, anyhow::Result<()>> {
        Box::pin(async move {
            let id = monitor.enter(&ctx);
            tokio::select! {
                _ = ctx.stopped() => {}
                _ = tokio::time::sleep(duration) => {}
            }
            monitor.leave(id);
            Ok(())
        })
    }
}

/// An action that signals when it starts and then plays until stopped.
fn until_stopped(
    started: mpsc::UnboundedSender<String>,
) -> impl FnOnce(PlaybackContext) -> BoxFuture<'static, anyhow::Result<()>> + Send + 'static {
    move |ctx: PlaybackContext| -> BoxFuture<'static, anyhow::Result<()>> {
        Box::pin(async move {
            let _ = started.send(ctx.identity().to_string());
            ctx.stopped().await;
            Ok(())
        })
    }
}

/// Deterministic generator for interleaving tests.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 33
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

// =============================================================================
// Immediate Path
// =============================================================================

mod immediate_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_idle_request_runs_immediately() {
        let arbiter = PlaybackArbiter::new();
        let observer = arbiter.clone();

        let result = arbiter
            .request_play("msg-1", move |ctx| async move {
                assert!(observer.is_playing("msg-1"));
                assert_eq!(observer.currently_playing().as_deref(), Some(ctx.identity()));
                Ok(())
            })
            .await;

        tokio_test::assert_ok!(result);
        assert!(!arbiter.is_playing("msg-1"));
        assert_eq!(arbiter.currently_playing(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_failure_propagates() {
        let arbiter = PlaybackArbiter::new();

        let result = arbiter
            .request_play("msg-1", |_| async { Err(anyhow::anyhow!("decoder exploded")) })
            .await;

        let err = tokio_test::assert_err!(result);
        assert!(matches!(err, PlaybackError::ActionFailed(_)));
        assert!(err.to_string().contains("decoder exploded"));
        assert_eq!(arbiter.currently_playing(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_caller_releases_slot() {
        let arbiter = PlaybackArbiter::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let player = arbiter.clone();
        let handle = tokio::spawn(async move {
            player
                .request_play("msg-1", |_| async move {
                    let _ = tx.send(());
                    std::future::pending::<()>().await;
                    Ok(())
                })
                .await
        });

        rx.recv().await;
        assert!(arbiter.is_playing("msg-1"));

        handle.abort();
        let _ = handle.await;
        assert_eq!(arbiter.currently_playing(), None);
    }
}

// =============================================================================
// Queue
// =============================================================================

mod queue_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_queued_requests_play_in_arrival_order() {
        let arbiter = PlaybackArbiter::new();
        let monitor = Arc::new(Monitor::default());
        let mut tasks = JoinSet::new();

        for (identity, ms) in [("a", 300), ("b", 100), ("c", 200), ("d", 50)] {
            let player = arbiter.clone();
            let action = timed(monitor.clone(), Duration::from_millis(ms));
            tasks.spawn(async move { player.request_play(identity, action).await });
            // Let each request register before the next arrives.
            tokio::task::yield_now().await;
        }

        assert_eq!(arbiter.currently_playing().as_deref(), Some("a"));
        assert_eq!(arbiter.queue_len(), 3);

        while let Some(joined) = tasks.join_next().await {
            tokio_test::assert_ok!(joined.expect("task panicked"));
        }

        assert_eq!(monitor.started(), vec!["a", "b", "c", "d"]);
        assert!(monitor.overlaps().is_empty());
        assert_eq!(arbiter.queue_len(), 0);
        assert_eq!(arbiter.currently_playing(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_caller_resolves_after_its_action_ran() {
        let arbiter = PlaybackArbiter::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let player = arbiter.clone();
        tokio::spawn(async move { player.request_play("first", until_stopped(tx)).await });
        assert_eq!(rx.recv().await.as_deref(), Some("first"));

        let ran = Arc::new(Mutex::new(false));
        let flag = ran.clone();
        let player = arbiter.clone();
        let queued = tokio::spawn(async move {
            player
                .request_play("second", move |_| async move {
                    *flag.lock() = true;
                    Ok(())
                })
                .await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!queued.is_finished());
        assert!(!*ran.lock());

        arbiter.stop_current();
        let result = queued.await.expect("task panicked");
        tokio_test::assert_ok!(result);
        assert!(*ran.lock());
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_failure_is_swallowed() {
        let arbiter = PlaybackArbiter::new();
        let monitor = Arc::new(Monitor::default());

        let player = arbiter.clone();
        let first = timed(monitor.clone(), Duration::from_millis(100));
        tokio::spawn(async move { player.request_play("first", first).await });
        tokio::task::yield_now().await;
        assert!(arbiter.is_playing("first"));

        let result = arbiter
            .request_play("second", |_| async { Err(anyhow::anyhow!("no output device")) })
            .await;

        tokio_test::assert_ok!(result);
        assert_eq!(arbiter.currently_playing(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_panic_does_not_wedge_the_queue() {
        let arbiter = PlaybackArbiter::new();
        let monitor = Arc::new(Monitor::default());

        let player = arbiter.clone();
        let first = timed(monitor.clone(), Duration::from_millis(100));
        tokio::spawn(async move { player.request_play("first", first).await });
        tokio::task::yield_now().await;

        let player = arbiter.clone();
        let panicking = tokio::spawn(async move {
            player
                .request_play("second", |_| async { panic!("boom") })
                .await
        });
        tokio::task::yield_now().await;

        let third = timed(monitor.clone(), Duration::from_millis(10));
        tokio_test::assert_ok!(arbiter.request_play("third", third).await);

        tokio_test::assert_ok!(panicking.await.expect("caller task panicked"));
        assert_eq!(monitor.started(), vec!["first", "third"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_queue_discards_waiting_callers() {
        let arbiter = PlaybackArbiter::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let player = arbiter.clone();
        tokio::spawn(async move { player.request_play("first", until_stopped(tx)).await });
        rx.recv().await;

        let player = arbiter.clone();
        let waiting =
            tokio::spawn(async move { player.request_play("second", |_| async { Ok(()) }).await });
        tokio::task::yield_now().await;
        assert_eq!(arbiter.queue_len(), 1);

        assert_eq!(arbiter.clear_queue(), 1);
        assert_eq!(arbiter.queue_len(), 0);

        let result = waiting.await.expect("task panicked");
        assert!(matches!(result, Err(PlaybackError::Discarded)));
        assert!(arbiter.is_playing("first"));
    }
}

// =============================================================================
// Stop And Retrigger
// =============================================================================

mod stop_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_retrigger_emits_exactly_one_stop_notice() {
        let arbiter = PlaybackArbiter::new();
        let mut notices = arbiter.subscribe();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let player = arbiter.clone();
        let first_tx = tx.clone();
        let first = tokio::spawn(async move { player.request_play("msg-1", until_stopped(first_tx)).await });
        rx.recv().await;

        let player = arbiter.clone();
        let second = tokio::spawn(async move { player.request_play("msg-1", until_stopped(tx)).await });
        rx.recv().await;

        assert_eq!(
            notices.try_recv().expect("one notice"),
            StopNotice {
                identity: "msg-1".to_string()
            }
        );
        assert!(notices.try_recv().is_err());

        tokio_test::assert_ok!(first.await.expect("task panicked"));
        assert!(arbiter.is_playing("msg-1"));
        assert_eq!(arbiter.queue_len(), 0);

        arbiter.stop_current();
        tokio_test::assert_ok!(second.await.expect("task panicked"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_completion_keeps_retriggered_playback() {
        let arbiter = PlaybackArbiter::new();

        // The first action ignores its stop signal and finishes late.
        let player = arbiter.clone();
        let first = tokio::spawn(async move {
            player
                .request_play("msg-1", |_| async {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Ok(())
                })
                .await
        });
        tokio::task::yield_now().await;

        let player = arbiter.clone();
        let second = tokio::spawn(async move {
            player
                .request_play("msg-1", |_| async {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    Ok(())
                })
                .await
        });
        tokio::task::yield_now().await;

        tokio_test::assert_ok!(first.await.expect("task panicked"));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(arbiter.is_playing("msg-1"));

        tokio_test::assert_ok!(second.await.expect("task panicked"));
        assert_eq!(arbiter.currently_playing(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_current_leaves_queue_intact() {
        let arbiter = PlaybackArbiter::new();
        let mut notices = arbiter.subscribe();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let player = arbiter.clone();
        let first_tx = tx.clone();
        tokio::spawn(async move { player.request_play("first", until_stopped(first_tx)).await });
        rx.recv().await;

        let player = arbiter.clone();
        let queued = tokio::spawn(async move { player.request_play("second", until_stopped(tx)).await });
        tokio::task::yield_now().await;

        assert_eq!(arbiter.stop_current().as_deref(), Some("first"));
        assert_eq!(arbiter.queue_len(), 1);
        assert_eq!(notices.try_recv().expect("notice").identity, "first");

        // The stopped action winds down and the queue moves on.
        assert_eq!(rx.recv().await.as_deref(), Some("second"));
        assert!(arbiter.is_playing("second"));

        arbiter.stop_current();
        tokio_test::assert_ok!(queued.await.expect("task panicked"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_current_when_idle() {
        let arbiter = PlaybackArbiter::new();
        let mut notices = arbiter.subscribe();

        assert_eq!(arbiter.stop_current(), None);
        assert!(notices.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_action_observes_cancellation() {
        let arbiter = PlaybackArbiter::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let player = arbiter.clone();
        let handle = tokio::spawn(async move {
            player
                .request_play("msg-1", move |ctx| async move {
                    let _ = tx.send(());
                    ctx.stopped().await;
                    assert!(ctx.is_stopped());
                    Ok(())
                })
                .await
        });

        rx.recv().await;
        arbiter.stop_current();
        tokio_test::assert_ok!(handle.await.expect("task panicked"));
    }
}

// =============================================================================
// Play Ended
// =============================================================================

mod play_ended_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_mismatched_identity_is_ignored() {
        let arbiter = PlaybackArbiter::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let player = arbiter.clone();
        tokio::spawn(async move { player.request_play("msg-1", until_stopped(tx)).await });
        rx.recv().await;

        arbiter.on_play_ended("msg-2");
        assert!(arbiter.is_playing("msg-1"));

        arbiter.stop_current();
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_ended_advances_queue_once() {
        let arbiter = PlaybackArbiter::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let player = arbiter.clone();
        let first_tx = tx.clone();
        tokio::spawn(async move { player.request_play("first", until_stopped(first_tx)).await });
        rx.recv().await;

        for identity in ["second", "third"] {
            let player = arbiter.clone();
            let action_tx = tx.clone();
            tokio::spawn(async move { player.request_play(identity, until_stopped(action_tx)).await });
            tokio::task::yield_now().await;
        }
        assert_eq!(arbiter.queue_len(), 2);

        arbiter.on_play_ended("first");
        arbiter.on_play_ended("first");

        assert_eq!(rx.recv().await.as_deref(), Some("second"));
        assert!(arbiter.is_playing("second"));
        assert_eq!(arbiter.queue_len(), 1);

        // The first action never returned; its lease no longer owns the slot.
        arbiter.on_play_ended("first");
        assert!(arbiter.is_playing("second"));

        arbiter.stop_current();
        assert_eq!(rx.recv().await.as_deref(), Some("third"));
        arbiter.stop_current();
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_ended_when_idle_is_noop() {
        let arbiter = PlaybackArbiter::new();
        arbiter.on_play_ended("nothing");
        assert_eq!(arbiter.currently_playing(), None);
        assert_eq!(arbiter.queue_len(), 0);
    }
}

// =============================================================================
// Interleavings
// =============================================================================

mod interleaving_tests {
    use super::*;

    async fn run_schedule(seed: u64) {
        let arbiter = PlaybackArbiter::new();
        let monitor = Arc::new(Monitor::default());
        let mut rng = Lcg(seed);
        let mut tasks = JoinSet::new();
        let identities = ["a", "b", "c", "d"];

        for _ in 0..60 {
            match rng.below(10) {
                0..=5 => {
                    let identity = identities[rng.below(4) as usize];
                    let duration = Duration::from_millis(1 + rng.below(40));
                    let player = arbiter.clone();
                    let action = timed(monitor.clone(), duration);
                    tasks.spawn(async move { player.request_play(identity, action).await });
                }
                6 => {
                    arbiter.stop_current();
                }
                7 => {
                    // Only stale reports here; a real end report would free the
                    // slot while the action is still running.
                    let identity = identities[rng.below(4) as usize];
                    if !arbiter.is_playing(identity) {
                        arbiter.on_play_ended(identity);
                    }
                }
                _ => {
                    tokio::time::sleep(Duration::from_millis(rng.below(25))).await;
                }
            }
            tokio::task::yield_now().await;
        }

        while let Some(joined) = tasks.join_next().await {
            tokio_test::assert_ok!(joined.expect("task panicked"));
        }

        assert!(
            monitor.overlaps().is_empty(),
            "seed {seed}: overlapping playback {:?}",
            monitor.overlaps()
        );
        assert_eq!(arbiter.queue_len(), 0, "seed {seed}");
        assert_eq!(arbiter.currently_playing(), None, "seed {seed}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_at_most_one_live_playback_across_random_schedules() {
        for seed in 1..=25 {
            run_schedule(seed).await;
        }
    }
}
