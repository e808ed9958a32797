//! The mode state machine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{info, warn};

use verse_api::types::EmergencyAck;
use verse_api::ApiError;
use verse_common::TradingMode;

use crate::session::SessionStore;
use crate::state::GlobalState;

use super::autopilot::{AutoLoopConfig, AutoTasks};
use super::ControlPlane;

/// Controller-internal mode state.
///
/// `PendingConfirmation` exists only client-side; the backend only ever
/// sees MANUAL and AUTO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeState {
    Manual,
    PendingConfirmation,
    Auto,
}

impl ModeState {
    /// The trading mode this state presents to the rest of the process.
    pub fn trading_mode(&self) -> TradingMode {
        match self {
            ModeState::Auto => TradingMode::Auto,
            _ => TradingMode::Manual,
        }
    }
}

impl std::fmt::Display for ModeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ModeState::Manual => "MANUAL",
            ModeState::PendingConfirmation => "PENDING_CONFIRMATION",
            ModeState::Auto => "AUTO",
        };
        write!(f, "{s}")
    }
}

/// Errors from mode transitions.
#[derive(Debug, Error)]
pub enum ModeError {
    /// The session may not toggle AUTO. Raised before any network call.
    #[error("AUTO mode requires a privileged operator session")]
    NotPrivileged,

    /// `confirm_auto` called without a pending request.
    #[error("no AUTO confirmation is pending")]
    NoPendingConfirmation,

    /// AUTO was requested while already engaged.
    #[error("AUTO mode is already engaged")]
    AlreadyEngaged,

    /// Another transition is still waiting for its acknowledgement.
    #[error("another mode transition is in flight")]
    Busy,

    /// Backend acknowledged with a non-success status.
    #[error("mode change rejected: {0}")]
    Rejected(String),

    /// The backend call itself failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Releases the in-flight mutation guard on drop.
struct TransitionGuard<'a>(&'a AtomicBool);

impl Drop for TransitionGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives the MANUAL / PENDING_CONFIRMATION / AUTO state machine.
pub struct ModeController<C: ControlPlane> {
    api: Arc<C>,
    session: Arc<SessionStore>,
    state: Arc<GlobalState>,
    loops: AutoLoopConfig,
    mode_state: RwLock<ModeState>,
    tasks: Mutex<Option<AutoTasks>>,
    in_flight: AtomicBool,
    orders_refresh: Arc<Notify>,
}

impl<C: ControlPlane> ModeController<C> {
    pub fn new(
        api: Arc<C>,
        session: Arc<SessionStore>,
        state: Arc<GlobalState>,
        loops: AutoLoopConfig,
    ) -> Self {
        Self {
            api,
            session,
            state,
            loops,
            mode_state: RwLock::new(ModeState::Manual),
            tasks: Mutex::new(None),
            in_flight: AtomicBool::new(false),
            orders_refresh: Arc::new(Notify::new()),
        }
    }

    /// Current state.
    pub fn state(&self) -> ModeState {
        *self.mode_state.read()
    }

    /// Current mode as the backend sees it.
    pub fn trading_mode(&self) -> TradingMode {
        self.state().trading_mode()
    }

    /// Notified whenever the autopilot executes a trade; the order-book
    /// view refreshes on it.
    pub fn orders_refresh(&self) -> Arc<Notify> {
        Arc::clone(&self.orders_refresh)
    }

    /// User asked to enable AUTO.
    ///
    /// Requires a privileged session — anything else is rejected here, with
    /// no network call and no state change. On success the state moves to
    /// `PendingConfirmation` and waits for [`confirm_auto`] or
    /// [`cancel_confirmation`].
    ///
    /// [`confirm_auto`]: Self::confirm_auto
    /// [`cancel_confirmation`]: Self::cancel_confirmation
    pub fn request_auto(&self) -> Result<ModeState, ModeError> {
        if !self.session.is_privileged() {
            return Err(ModeError::NotPrivileged);
        }

        let mut state = self.mode_state.write();
        match *state {
            ModeState::Manual => {
                *state = ModeState::PendingConfirmation;
                info!("AUTO requested; awaiting confirmation");
                Ok(*state)
            }
            ModeState::PendingConfirmation => Ok(*state),
            ModeState::Auto => Err(ModeError::AlreadyEngaged),
        }
    }

    /// User cancelled the confirmation dialog. No backend call.
    pub fn cancel_confirmation(&self) -> ModeState {
        let mut state = self.mode_state.write();
        if *state == ModeState::PendingConfirmation {
            *state = ModeState::Manual;
            info!("AUTO confirmation cancelled");
        }
        *state
    }

    /// User confirmed the pending AUTO request.
    ///
    /// The local state flips to AUTO optimistically, then the backend is
    /// asked to acknowledge. On success the heartbeat and decision loops
    /// start; on a rejected ack or a failed call the state rolls back to
    /// MANUAL and the failure is surfaced.
    pub async fn confirm_auto(&self) -> Result<(), ModeError> {
        let _guard = self.begin_transition()?;

        {
            let mut state = self.mode_state.write();
            if *state != ModeState::PendingConfirmation {
                return Err(ModeError::NoPendingConfirmation);
            }
            *state = ModeState::Auto; // optimistic; final on ack
        }
        self.state.control.engage_auto();

        match self.api.set_mode(TradingMode::Auto).await {
            Ok(ack) if ack.is_success() => {
                self.start_loops();
                info!("AUTO mode engaged");
                Ok(())
            }
            Ok(ack) => {
                self.rollback_to_manual();
                Err(ModeError::Rejected(ack.failure_message()))
            }
            Err(e) => {
                self.rollback_to_manual();
                Err(ModeError::Api(e))
            }
        }
    }

    /// User asked to return to MANUAL.
    ///
    /// Always permitted for a privileged session. From
    /// `PendingConfirmation` this is just a cancel; from AUTO the local
    /// state flips optimistically and the loops are stopped only once the
    /// backend acknowledges.
    pub async fn disengage(&self) -> Result<(), ModeError> {
        if !self.session.is_privileged() {
            return Err(ModeError::NotPrivileged);
        }

        let _guard = self.begin_transition()?;

        {
            let mut state = self.mode_state.write();
            match *state {
                ModeState::Manual => return Ok(()),
                ModeState::PendingConfirmation => {
                    *state = ModeState::Manual;
                    return Ok(());
                }
                ModeState::Auto => {
                    *state = ModeState::Manual; // optimistic; final on ack
                }
            }
        }
        self.state.control.disengage_auto();

        match self.api.set_mode(TradingMode::Manual).await {
            Ok(ack) if ack.is_success() => {
                self.stop_loops();
                info!("AUTO mode disengaged");
                Ok(())
            }
            Ok(ack) => {
                self.restore_auto();
                Err(ModeError::Rejected(ack.failure_message()))
            }
            Err(e) => {
                self.restore_auto();
                Err(ModeError::Api(e))
            }
        }
    }

    /// Manual kill switch: backend liquidates and the client forces MANUAL.
    pub async fn emergency_stop(&self) -> Result<EmergencyAck, ModeError> {
        if !self.session.is_privileged() {
            return Err(ModeError::NotPrivileged);
        }

        match self.api.emergency_stop().await {
            Ok(ack) if ack.is_success() => {
                *self.mode_state.write() = ModeState::Manual;
                self.state.control.disengage_auto();
                self.stop_loops();
                warn!(message = ?ack.message, "emergency stop executed; mode forced to MANUAL");
                Ok(ack)
            }
            Ok(ack) => Err(ModeError::Rejected(ack.message.clone().unwrap_or_else(
                || format!("emergency stop rejected (status: {})", ack.status),
            ))),
            Err(e) => Err(ModeError::Api(e)),
        }
    }

    fn begin_transition(&self) -> Result<TransitionGuard<'_>, ModeError> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            return Err(ModeError::Busy);
        }
        Ok(TransitionGuard(&self.in_flight))
    }

    fn start_loops(&self) {
        let tasks = AutoTasks::start(
            Arc::clone(&self.api),
            Arc::clone(&self.state),
            self.loops.clone(),
            Arc::clone(&self.orders_refresh),
        );
        let mut slot = self.tasks.lock();
        if let Some(old) = slot.take() {
            old.stop();
        }
        *slot = Some(tasks);
    }

    fn stop_loops(&self) {
        if let Some(tasks) = self.tasks.lock().take() {
            tasks.stop();
        }
    }

    /// Revert a failed MANUAL→AUTO transition.
    fn rollback_to_manual(&self) {
        *self.mode_state.write() = ModeState::Manual;
        self.state.control.disengage_auto();
        self.stop_loops();
        self.state.metrics.record_rollback();
        warn!("AUTO engagement rolled back to MANUAL");
    }

    /// Revert a failed AUTO→MANUAL transition. The loops were never
    /// stopped, so AUTO simply continues.
    fn restore_auto(&self) {
        *self.mode_state.write() = ModeState::Auto;
        self.state.control.engage_auto();
        self.state.metrics.record_rollback();
        warn!("disengage rejected; AUTO remains active");
    }
}

impl<C: ControlPlane> std::fmt::Debug for ModeController<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeController")
            .field("state", &self.state())
            .finish()
    }
}
