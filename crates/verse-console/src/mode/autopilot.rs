//! Background loops that run while AUTO mode is engaged.
//!
//! Two loops, both started on a confirmed transition to AUTO and stopped on
//! disengage:
//!
//! - **Heartbeat**: short fixed interval; keeps the backend watchdog from
//!   reverting the user to MANUAL. Failures are logged and swallowed — a
//!   missed pulse never stops AUTO mode client-side.
//! - **Decision**: longer interval; asks the backend to evaluate and
//!   possibly execute one trade. An executed trade triggers an order-book
//!   refresh notification. A failed cycle is logged and simply retried on
//!   the next tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use verse_api::types::AutopilotStatus;

use crate::config::AutopilotConfig;
use crate::state::GlobalState;

use super::ControlPlane;

/// Loop parameters, derived from [`AutopilotConfig`].
#[derive(Debug, Clone)]
pub struct AutoLoopConfig {
    /// Heartbeat interval. Must stay under the backend watchdog timeout
    /// (enforced by config validation).
    pub heartbeat_interval: Duration,
    /// Decision cycle interval.
    pub decision_interval: Duration,
    /// Symbol the decision cycle trades.
    pub symbol: String,
    /// Quantity per executed trade.
    pub quantity: u32,
}

impl From<&AutopilotConfig> for AutoLoopConfig {
    fn from(config: &AutopilotConfig) -> Self {
        Self {
            heartbeat_interval: config.heartbeat_interval(),
            decision_interval: config.decision_interval(),
            symbol: config.symbol.clone(),
            quantity: config.quantity,
        }
    }
}

/// Handles for the running AUTO-mode loops.
#[derive(Debug)]
pub(crate) struct AutoTasks {
    stop_tx: watch::Sender<bool>,
    heartbeat: JoinHandle<()>,
    decisions: JoinHandle<()>,
}

impl AutoTasks {
    pub(crate) fn start<C: ControlPlane>(
        api: Arc<C>,
        state: Arc<GlobalState>,
        config: AutoLoopConfig,
        orders_refresh: Arc<Notify>,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);

        let heartbeat = spawn_heartbeat_loop(
            Arc::clone(&api),
            Arc::clone(&state),
            config.heartbeat_interval,
            stop_rx.clone(),
        );
        let decisions = spawn_decision_loop(api, state, config, orders_refresh, stop_rx);

        Self {
            stop_tx,
            heartbeat,
            decisions,
        }
    }

    /// Signal both loops to exit. An in-flight request finishes; the loop
    /// observes the signal at its next select point. The handles are dropped
    /// without aborting for the same reason.
    pub(crate) fn stop(self) {
        let _ = self.stop_tx.send(true);
        drop(self.heartbeat);
        drop(self.decisions);
    }
}

/// AUTO-mode liveness pulse loop.
fn spawn_heartbeat_loop<C: ControlPlane>(
    api: Arc<C>,
    state: Arc<GlobalState>,
    interval: Duration,
    mut stop: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        info!(interval_ms = interval.as_millis() as u64, "heartbeat loop started");
        loop {
            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        debug!("heartbeat loop stopped");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    match api.heartbeat().await {
                        Ok(ack) if ack.is_success() => {
                            state.metrics.record_heartbeat_sent();
                        }
                        Ok(ack) => {
                            state.metrics.record_heartbeat_failure();
                            warn!(status = %ack.status, "heartbeat not acknowledged");
                        }
                        Err(e) => {
                            state.metrics.record_heartbeat_failure();
                            warn!(error = %e, "heartbeat failed; AUTO mode continues");
                        }
                    }
                }
            }
        }
    })
}

/// Autopilot decision cycle loop.
fn spawn_decision_loop<C: ControlPlane>(
    api: Arc<C>,
    state: Arc<GlobalState>,
    config: AutoLoopConfig,
    orders_refresh: Arc<Notify>,
    mut stop: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.decision_interval);
        info!(
            symbol = %config.symbol,
            interval_ms = config.decision_interval.as_millis() as u64,
            "autopilot decision loop started"
        );
        loop {
            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        debug!("autopilot decision loop stopped");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    match api.autopilot_cycle(&config.symbol, config.quantity).await {
                        Ok(report) => {
                            state.metrics.record_autopilot_cycle();
                            match report.status {
                                AutopilotStatus::Complete => {
                                    state.metrics.record_trade_executed();
                                    info!(
                                        symbol = %config.symbol,
                                        order_id = ?report.order_id,
                                        "autopilot executed a trade"
                                    );
                                    orders_refresh.notify_waiters();
                                }
                                AutopilotStatus::Hold => {
                                    debug!(reason = ?report.reason, "autopilot held");
                                }
                                AutopilotStatus::Rejected => {
                                    // Business failure: surfaced verbatim,
                                    // not retried within the cycle.
                                    warn!(reason = ?report.reason, "autopilot trade rejected");
                                }
                                AutopilotStatus::Other => {
                                    warn!("autopilot returned an unrecognized status");
                                }
                            }
                        }
                        Err(e) => {
                            state.metrics.record_autopilot_failure();
                            warn!(error = %e, "autopilot cycle failed; retrying next tick");
                        }
                    }
                }
            }
        }
    })
}
