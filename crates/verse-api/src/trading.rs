//! Trading endpoints: the autopilot decision cycle and the kill switch.

use serde_json::json;

use crate::client::{ApiClient, ApiError};
use crate::types::{AutopilotReport, EmergencyAck};

impl ApiClient {
    /// Run one autopilot decision+execution cycle
    /// (`POST /api/trading/autopilot`).
    ///
    /// The backend de-duplicates via the request ID attached to every POST;
    /// the client never retries this call within a cycle — a failed cycle
    /// simply waits for the next tick.
    pub async fn autopilot(&self, symbol: &str, quantity: u32) -> Result<AutopilotReport, ApiError> {
        self.post_json(
            "/api/trading/autopilot",
            &json!({ "symbol": symbol, "quantity": quantity }),
        )
        .await
    }

    /// Trigger the manual kill switch (`POST /api/broker/emergency`).
    ///
    /// On success the backend liquidates open positions and reverts the
    /// execution mode to MANUAL.
    pub async fn emergency_stop(&self) -> Result<EmergencyAck, ApiError> {
        self.post_json("/api/broker/emergency", &json!({})).await
    }
}
