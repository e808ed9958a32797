//! Monitoring endpoints: heartbeat, autopilot run state, readiness.

use serde_json::json;

use crate::client::{ApiClient, ApiError};
use crate::types::{HealthStatus, HeartbeatAck, ObservatoryStatus};

impl ApiClient {
    /// Send an AUTO-mode liveness pulse (`POST /api/monitoring/heartbeat`).
    ///
    /// The backend watchdog reverts the user to MANUAL when pulses stop
    /// arriving, so the caller's interval must stay well under the watchdog
    /// timeout.
    pub async fn heartbeat(&self) -> Result<HeartbeatAck, ApiError> {
        self.post_json("/api/monitoring/heartbeat", &json!({})).await
    }

    /// Fetch the autopilot run state (`GET /api/observatory/status`).
    pub async fn observatory_status(&self) -> Result<ObservatoryStatus, ApiError> {
        self.get_json("/api/observatory/status").await
    }

    /// Check backend readiness (`GET /api/health`).
    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.get_json("/api/health").await
    }
}
