//! Global shared state: control flags and metrics counters.
//!
//! All fields are atomics so pollers and controllers can read and record
//! without locks. The mode and environment controllers are the only writers
//! of the control flags; pollers only ever increment counters.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use verse_common::Environment;

/// Process-wide control flags.
#[derive(Debug, Default)]
pub struct ControlFlags {
    /// AUTO mode engaged (heartbeat + autopilot loops running).
    auto_engaged: AtomicBool,
    /// Environment is LIVE (false = MOCK).
    live_environment: AtomicBool,
}

impl ControlFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the autopilot loops should be running.
    #[inline]
    pub fn is_auto_engaged(&self) -> bool {
        self.auto_engaged.load(Ordering::Acquire)
    }

    #[inline]
    pub fn engage_auto(&self) {
        self.auto_engaged.store(true, Ordering::Release);
    }

    #[inline]
    pub fn disengage_auto(&self) {
        self.auto_engaged.store(false, Ordering::Release);
    }

    /// Current environment.
    #[inline]
    pub fn environment(&self) -> Environment {
        if self.live_environment.load(Ordering::Acquire) {
            Environment::Live
        } else {
            Environment::Mock
        }
    }

    #[inline]
    pub fn set_environment(&self, env: Environment) {
        self.live_environment
            .store(env.is_live(), Ordering::Release);
    }
}

/// Monotonic counters for observability.
///
/// Incremented from the hot paths (poll ticks, heartbeats); read only when a
/// snapshot is taken for logging.
#[derive(Debug, Default)]
pub struct MetricsCounters {
    /// Poll fetches issued (across every subscription).
    pub polls_issued: AtomicU64,
    /// Poll fetches that failed (network, non-2xx, malformed payload).
    pub poll_failures: AtomicU64,
    /// Snapshots applied to subscribers.
    pub snapshots_applied: AtomicU64,
    /// Responses discarded because a newer fetch already landed.
    pub stale_discarded: AtomicU64,
    /// Heartbeats acknowledged by the backend.
    pub heartbeats_sent: AtomicU64,
    /// Heartbeats that failed (logged and swallowed).
    pub heartbeat_failures: AtomicU64,
    /// Autopilot decision cycles completed (any outcome).
    pub autopilot_cycles: AtomicU64,
    /// Autopilot cycles that errored (retried next tick).
    pub autopilot_failures: AtomicU64,
    /// Trades the backend reported as executed.
    pub trades_executed: AtomicU64,
    /// Optimistic mutations rolled back after a rejected ack.
    pub mutations_rolled_back: AtomicU64,
}

impl MetricsCounters {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_poll_issued(&self) {
        self.polls_issued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_poll_failure(&self) {
        self.poll_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_snapshot_applied(&self) {
        self.snapshots_applied.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_stale_discarded(&self) {
        self.stale_discarded.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_heartbeat_sent(&self) {
        self.heartbeats_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_heartbeat_failure(&self) {
        self.heartbeat_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_autopilot_cycle(&self) {
        self.autopilot_cycles.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_autopilot_failure(&self) {
        self.autopilot_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_trade_executed(&self) {
        self.trades_executed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_rollback(&self) {
        self.mutations_rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a consistent-enough snapshot for logging.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            polls_issued: self.polls_issued.load(Ordering::Relaxed),
            poll_failures: self.poll_failures.load(Ordering::Relaxed),
            snapshots_applied: self.snapshots_applied.load(Ordering::Relaxed),
            stale_discarded: self.stale_discarded.load(Ordering::Relaxed),
            heartbeats_sent: self.heartbeats_sent.load(Ordering::Relaxed),
            heartbeat_failures: self.heartbeat_failures.load(Ordering::Relaxed),
            autopilot_cycles: self.autopilot_cycles.load(Ordering::Relaxed),
            autopilot_failures: self.autopilot_failures.load(Ordering::Relaxed),
            trades_executed: self.trades_executed.load(Ordering::Relaxed),
            mutations_rolled_back: self.mutations_rolled_back.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`MetricsCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub polls_issued: u64,
    pub poll_failures: u64,
    pub snapshots_applied: u64,
    pub stale_discarded: u64,
    pub heartbeats_sent: u64,
    pub heartbeat_failures: u64,
    pub autopilot_cycles: u64,
    pub autopilot_failures: u64,
    pub trades_executed: u64,
    pub mutations_rolled_back: u64,
}

/// Global shared state for the console.
#[derive(Debug, Default)]
pub struct GlobalState {
    /// Control flags (AUTO engaged, environment).
    pub control: ControlFlags,
    /// Metrics counters.
    pub metrics: MetricsCounters,
}

impl GlobalState {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_flags_default() {
        let flags = ControlFlags::new();
        assert!(!flags.is_auto_engaged());
        assert_eq!(flags.environment(), Environment::Mock);
    }

    #[test]
    fn test_control_flags_auto_toggle() {
        let flags = ControlFlags::new();
        flags.engage_auto();
        assert!(flags.is_auto_engaged());
        flags.disengage_auto();
        assert!(!flags.is_auto_engaged());
    }

    #[test]
    fn test_control_flags_environment() {
        let flags = ControlFlags::new();
        flags.set_environment(Environment::Live);
        assert_eq!(flags.environment(), Environment::Live);
        flags.set_environment(Environment::Mock);
        assert_eq!(flags.environment(), Environment::Mock);
    }

    #[test]
    fn test_metrics_snapshot() {
        let metrics = MetricsCounters::new();
        metrics.record_poll_issued();
        metrics.record_poll_issued();
        metrics.record_poll_failure();
        metrics.record_trade_executed();
        metrics.record_rollback();

        let snap = metrics.snapshot();
        assert_eq!(snap.polls_issued, 2);
        assert_eq!(snap.poll_failures, 1);
        assert_eq!(snap.trades_executed, 1);
        assert_eq!(snap.mutations_rolled_back, 1);
        assert_eq!(snap.heartbeats_sent, 0);
    }
}
