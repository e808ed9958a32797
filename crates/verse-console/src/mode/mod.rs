//! Execution-mode control: MANUAL / AUTO with confirmation.
//!
//! The controller owns a three-state machine:
//!
//! - `Manual`: every trade requires explicit user action.
//! - `PendingConfirmation`: a privileged user requested AUTO; nothing has
//!   been sent to the backend yet.
//! - `Auto`: the backend acknowledged the transition; a heartbeat loop and
//!   a decision loop run until disengaged.
//!
//! Transitions that talk to the backend are optimistic: local state flips
//! first for responsiveness and is rolled back with the failure surfaced
//! when the acknowledgement is missing or negative.

pub mod autopilot;
pub mod controller;

use async_trait::async_trait;

use verse_api::types::{AutopilotReport, EmergencyAck, HeartbeatAck, ModeAck};
use verse_api::{ApiClient, ApiError};
use verse_common::TradingMode;

pub use autopilot::AutoLoopConfig;
pub use controller::{ModeController, ModeError, ModeState};

/// Backend seam for mode transitions and the AUTO-mode loops.
///
/// `ApiClient` is the production implementation; tests substitute mocks to
/// verify the no-network guarantees and rollback behavior.
#[async_trait]
pub trait ControlPlane: Send + Sync + 'static {
    async fn set_mode(&self, mode: TradingMode) -> Result<ModeAck, ApiError>;
    async fn heartbeat(&self) -> Result<HeartbeatAck, ApiError>;
    async fn autopilot_cycle(
        &self,
        symbol: &str,
        quantity: u32,
    ) -> Result<AutopilotReport, ApiError>;
    async fn emergency_stop(&self) -> Result<EmergencyAck, ApiError>;
}

#[async_trait]
impl ControlPlane for ApiClient {
    async fn set_mode(&self, mode: TradingMode) -> Result<ModeAck, ApiError> {
        ApiClient::set_mode(self, mode).await
    }

    async fn heartbeat(&self) -> Result<HeartbeatAck, ApiError> {
        ApiClient::heartbeat(self).await
    }

    async fn autopilot_cycle(
        &self,
        symbol: &str,
        quantity: u32,
    ) -> Result<AutopilotReport, ApiError> {
        self.autopilot(symbol, quantity).await
    }

    async fn emergency_stop(&self) -> Result<EmergencyAck, ApiError> {
        ApiClient::emergency_stop(self).await
    }
}
