//! Generic polling subscription.
//!
//! One abstraction replaces every ad-hoc per-view timer: a fetcher plus an
//! interval, producing a stream of snapshots. Policies:
//!
//! - **Best-effort freshness**: a failed fetch (network error, non-2xx,
//!   malformed payload) is logged and counted; the previous snapshot is
//!   retained and the timer keeps running. Staleness is preferred over
//!   visible breakage.
//! - **Fire-and-forget ticks**: each tick spawns its fetch as its own task,
//!   so a slow fetch never delays the next tick.
//! - **Stale responses discarded**: every fetch carries a monotonic sequence
//!   number and a response older than the last-applied one is dropped, so
//!   subscribers always see the result of the most recently issued request
//!   among those that arrived.
//! - **Idempotent stop**: `stop()` only prevents future ticks; an in-flight
//!   fetch is not aborted (its late result still passes the sequence gate).

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use verse_api::ApiError;

use crate::state::GlobalState;

/// One applied poll result.
#[derive(Debug, Clone)]
pub struct PollSnapshot<T> {
    /// Sequence number of the fetch that produced this value.
    pub seq: u64,
    /// Decoded payload.
    pub value: T,
    /// When the response was applied.
    pub fetched_at: DateTime<Utc>,
}

/// Handle to a live polling subscription.
///
/// Dropping the handle stops the subscription (a view unmounting discards
/// its handle).
pub struct PollHandle<T> {
    name: String,
    rx: watch::Receiver<Option<PollSnapshot<T>>>,
    stopped: Arc<AtomicBool>,
    ticker: JoinHandle<()>,
}

impl<T: Clone + Send + Sync + 'static> PollHandle<T> {
    /// Start a subscription: one immediate fetch, then one per interval.
    pub fn spawn<F, Fut>(
        name: impl Into<String>,
        interval: Duration,
        state: Arc<GlobalState>,
        fetcher: F,
    ) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let name = name.into();
        let (tx, rx) = watch::channel(None);
        let tx = Arc::new(tx);
        let stopped = Arc::new(AtomicBool::new(false));

        let issued = Arc::new(AtomicU64::new(0));
        let applied = Arc::new(AtomicU64::new(0));

        let ticker = {
            let name = name.clone();
            let stopped = Arc::clone(&stopped);
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                loop {
                    ticker.tick().await;
                    if stopped.load(Ordering::Acquire) {
                        break;
                    }

                    let seq = issued.fetch_add(1, Ordering::AcqRel) + 1;
                    state.metrics.record_poll_issued();

                    let future = fetcher();
                    let name = name.clone();
                    let tx = Arc::clone(&tx);
                    let applied = Arc::clone(&applied);
                    let state = Arc::clone(&state);
                    tokio::spawn(async move {
                        match future.await {
                            Ok(value) => {
                                apply_if_newer(&name, seq, value, &tx, &applied, &state);
                            }
                            Err(e) => {
                                state.metrics.record_poll_failure();
                                warn!(
                                    poller = %name,
                                    seq,
                                    error = %e,
                                    "poll failed; keeping previous snapshot"
                                );
                            }
                        }
                    });
                }
            })
        };

        Self {
            name,
            rx,
            stopped,
            ticker,
        }
    }

    /// Subscription name (for logs).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Latest applied value, if any fetch has succeeded yet.
    pub fn latest(&self) -> Option<T> {
        self.rx.borrow().as_ref().map(|s| s.value.clone())
    }

    /// Latest applied snapshot with its sequence number.
    pub fn latest_snapshot(&self) -> Option<PollSnapshot<T>> {
        self.rx.borrow().clone()
    }

    /// A receiver that can await snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<PollSnapshot<T>>> {
        self.rx.clone()
    }

    /// Whether `stop()` has been called (or the handle dropped).
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Cancel the subscription. Idempotent: safe to call repeatedly or on an
    /// already-stopped handle. Only future ticks are prevented; an in-flight
    /// fetch runs to completion and its result goes through the sequence
    /// gate like any other.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            self.ticker.abort();
            debug!(poller = %self.name, "poll subscription stopped");
        }
    }
}

impl<T> Drop for PollHandle<T> {
    fn drop(&mut self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            self.ticker.abort();
        }
    }
}

/// Apply a fetched value unless a newer fetch already landed.
fn apply_if_newer<T>(
    name: &str,
    seq: u64,
    value: T,
    tx: &watch::Sender<Option<PollSnapshot<T>>>,
    applied: &AtomicU64,
    state: &GlobalState,
) {
    loop {
        let current = applied.load(Ordering::Acquire);
        if seq <= current {
            state.metrics.record_stale_discarded();
            debug!(poller = %name, seq, current, "discarding stale poll response");
            return;
        }
        if applied
            .compare_exchange(current, seq, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let _ = tx.send_replace(Some(PollSnapshot {
                seq,
                value,
                fetched_at: Utc::now(),
            }));
            state.metrics.record_snapshot_applied();
            return;
        }
    }
}
