//! Tradeverse control console.
//!
//! This crate implements the session / polling / mode-control core of the
//! Tradeverse dashboard as a headless client:
//!
//! - **Session store**: token + role lifecycle with durable local
//!   persistence; one shared token slot feeds every API call.
//! - **Poller**: a single generic polling subscription replacing the ad-hoc
//!   per-view timers — best-effort freshness, stale responses discarded by
//!   sequence number.
//! - **Mode controller**: MANUAL / PENDING_CONFIRMATION / AUTO state machine
//!   with optimistic transitions, rollback on rejected acks, and the
//!   heartbeat + autopilot loops that AUTO requires.
//! - **Environment switch**: MOCK / LIVE gating with forced demotion when
//!   the broker link drops.
//!
//! ## Modules
//!
//! - `config`: Configuration loading and validation
//! - `state`: Global control flags and metrics counters
//! - `session`: Session store and on-disk persistence
//! - `poller`: Generic polling subscription
//! - `mode`: Mode controller and AUTO-mode background loops
//! - `environment`: MOCK/LIVE switch and consistency watch

pub mod config;
pub mod environment;
pub mod mode;
pub mod poller;
pub mod session;
pub mod state;

pub use config::{AutopilotConfig, ConsoleConfig, PollingConfig};
pub use environment::{EnvironmentController, EnvironmentError, SettingsPlane};
pub use mode::{AutoLoopConfig, ControlPlane, ModeController, ModeError, ModeState};
pub use poller::{PollHandle, PollSnapshot};
pub use session::{
    AuthApi, Session, SessionDisk, SessionError, SessionStore, GUEST_IDENTITY, GUEST_TOKEN,
};
pub use state::{ControlFlags, GlobalState, MetricsCounters, MetricsSnapshot};
