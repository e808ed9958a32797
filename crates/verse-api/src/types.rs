//! Wire types for the Tradeverse API.
//!
//! Acknowledgement payloads follow the backend's `{"status": "success", ...}`
//! convention; each ack exposes `is_success()` so callers never string-match.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use verse_common::{Environment, TradingMode, UserProfile};

/// Broker credentials as echoed by `GET /api/settings`.
///
/// The backend masks nothing; these are only ever held in memory and are
/// never written to the session file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrokerCredentials {
    #[serde(default)]
    pub angel_client_id: String,
    #[serde(default)]
    pub angel_api_key: String,
    #[serde(default)]
    pub angel_totp_key: String,
    #[serde(default)]
    pub angel_password: String,
}

/// Snapshot from `GET /api/settings`: environment, broker link, mode.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsSnapshot {
    /// Current environment (MOCK or LIVE).
    #[serde(default)]
    pub env: Environment,
    /// Active broker identifier (e.g. "ANGEL", "MOCK_KITE").
    #[serde(default)]
    pub active_broker: String,
    /// User profile for the authenticated session.
    #[serde(default)]
    pub user_profile: UserProfile,
    /// Whether the backend holds an active broker connection.
    ///
    /// LIVE is only consistent while this is true; observing `false` in
    /// LIVE forces a demotion to MOCK.
    #[serde(default)]
    pub angel_connected: bool,
    /// Broker status string.
    #[serde(default)]
    pub broker_status: String,
    /// Stored broker credentials.
    #[serde(default)]
    pub angel_credentials: BrokerCredentials,
    /// Current execution mode.
    #[serde(default)]
    pub mode: TradingMode,
}

/// Partial update body for `POST /api/settings/update`.
///
/// Only set fields are serialized; the backend merges into stored settings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SettingsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<Environment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_broker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angel_client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angel_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angel_totp_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angel_password: Option<String>,
}

impl SettingsUpdate {
    /// Update that only changes the environment.
    pub fn environment(env: Environment) -> Self {
        Self {
            env: Some(env),
            ..Self::default()
        }
    }

    /// Set the active broker.
    pub fn with_broker(mut self, broker: impl Into<String>) -> Self {
        self.active_broker = Some(broker.into());
        self
    }
}

/// Acknowledgement from `POST /api/settings/update`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAck {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub env: Environment,
    #[serde(default)]
    pub active_broker: Option<String>,
    /// Whether the backend verified broker connectivity with the new
    /// settings.
    #[serde(default)]
    pub broker_connected: bool,
    /// Backend-reported failure detail, if any.
    #[serde(default)]
    pub error: Option<String>,
}

impl UpdateAck {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Acknowledgement from `POST /api/settings/mode`.
#[derive(Debug, Clone, Deserialize)]
pub struct ModeAck {
    #[serde(default)]
    pub status: String,
    /// Mode the backend settled on. Present on success.
    #[serde(default)]
    pub mode: Option<TradingMode>,
    /// Failure detail on non-success.
    #[serde(default)]
    pub message: Option<String>,
}

impl ModeAck {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    /// Failure message for display, with a fallback for terse backends.
    pub fn failure_message(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| format!("mode change rejected (status: {})", self.status))
    }
}

/// Acknowledgement from `POST /api/monitoring/heartbeat`.
#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatAck {
    #[serde(default)]
    pub status: String,
}

impl HeartbeatAck {
    pub fn is_success(&self) -> bool {
        self.status == "pulse_received"
    }
}

/// Autopilot run state from `GET /api/observatory/status`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObservatoryStatus {
    /// Whether an autopilot run is currently active server-side.
    #[serde(default)]
    pub active: bool,
    /// Mode the backend believes it is in.
    #[serde(default)]
    pub mode: Option<TradingMode>,
    /// Timestamp of the last completed decision cycle.
    #[serde(default)]
    pub last_cycle_at: Option<DateTime<Utc>>,
    /// Decision cycles completed since the run started.
    #[serde(default)]
    pub cycles_completed: u64,
}

/// Outcome of one autopilot decision cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum AutopilotStatus {
    /// Signal filter rejected the trade; nothing executed.
    #[serde(rename = "HOLD")]
    Hold,
    /// A trade was executed.
    #[serde(rename = "COMPLETE")]
    Complete,
    /// Risk engine or broker rejected the trade.
    #[serde(rename = "REJECTED")]
    Rejected,
    /// Any status this client does not recognize.
    #[serde(other)]
    Other,
}

/// Report from `POST /api/trading/autopilot` — one decision+execution cycle.
#[derive(Debug, Clone, Deserialize)]
pub struct AutopilotReport {
    pub status: AutopilotStatus,
    /// Human-readable reason on HOLD/REJECTED.
    #[serde(default)]
    pub reason: Option<String>,
    /// Broker order id when a trade executed.
    #[serde(default)]
    pub order_id: Option<String>,
    /// Symbol the cycle acted on.
    #[serde(default)]
    pub symbol: Option<String>,
}

impl AutopilotReport {
    /// Whether the backend reports an executed trade this cycle.
    pub fn executed(&self) -> bool {
        self.status == AutopilotStatus::Complete
    }
}

/// Acknowledgement from `POST /api/broker/emergency`.
#[derive(Debug, Clone, Deserialize)]
pub struct EmergencyAck {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    /// Mode after the emergency protocol ran (backend reverts to MANUAL).
    #[serde(default)]
    pub mode: Option<TradingMode>,
}

impl EmergencyAck {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Generic `{"status", "message"}` acknowledgement (logout, trusted IPs).
#[derive(Debug, Clone, Deserialize)]
pub struct StatusAck {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl StatusAck {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Trusted IP allow-list from `GET /api/settings/trusted-ips`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrustedIpList {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub trusted_ips: Vec<String>,
}

/// Readiness from `GET /api/health`.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,
}

impl HealthStatus {
    pub fn is_ready(&self) -> bool {
        self.status == "READY"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_snapshot_decode() {
        let snapshot: SettingsSnapshot = serde_json::from_str(
            r#"{
                "env": "LIVE",
                "active_broker": "ANGEL",
                "user_profile": {"user_id": "u-1", "email": "ops@tradeverse.ai"},
                "angel_connected": true,
                "broker_status": "CONNECTED",
                "angel_credentials": {"angel_client_id": "A123"},
                "mode": "AUTO"
            }"#,
        )
        .unwrap();
        assert_eq!(snapshot.env, Environment::Live);
        assert!(snapshot.angel_connected);
        assert_eq!(snapshot.mode, TradingMode::Auto);
        assert_eq!(snapshot.angel_credentials.angel_client_id, "A123");
    }

    #[test]
    fn test_settings_snapshot_defaults() {
        let snapshot: SettingsSnapshot = serde_json::from_str("{}").unwrap();
        assert_eq!(snapshot.env, Environment::Mock);
        assert_eq!(snapshot.mode, TradingMode::Manual);
        assert!(!snapshot.angel_connected);
    }

    #[test]
    fn test_settings_update_serializes_only_set_fields() {
        let update = SettingsUpdate::environment(Environment::Mock);
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({"env": "MOCK"}));

        let update = SettingsUpdate::environment(Environment::Live).with_broker("ANGEL");
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"env": "LIVE", "active_broker": "ANGEL"})
        );
    }

    #[test]
    fn test_mode_ack_success() {
        let ack: ModeAck =
            serde_json::from_str(r#"{"status": "success", "mode": "AUTO"}"#).unwrap();
        assert!(ack.is_success());
        assert_eq!(ack.mode, Some(TradingMode::Auto));
    }

    #[test]
    fn test_mode_ack_failure_message() {
        let ack: ModeAck =
            serde_json::from_str(r#"{"status": "error", "message": "Invalid mode"}"#).unwrap();
        assert!(!ack.is_success());
        assert_eq!(ack.failure_message(), "Invalid mode");

        let terse: ModeAck = serde_json::from_str(r#"{"status": "error"}"#).unwrap();
        assert!(terse.failure_message().contains("error"));
    }

    #[test]
    fn test_autopilot_report_statuses() {
        let hold: AutopilotReport = serde_json::from_str(
            r#"{"status": "HOLD", "reason": "Signal filter rejected trade"}"#,
        )
        .unwrap();
        assert!(!hold.executed());

        let done: AutopilotReport = serde_json::from_str(
            r#"{"status": "COMPLETE", "order_id": "240101000042", "symbol": "NSE:BANKNIFTY"}"#,
        )
        .unwrap();
        assert!(done.executed());
        assert_eq!(done.order_id.as_deref(), Some("240101000042"));

        let odd: AutopilotReport = serde_json::from_str(r#"{"status": "THROTTLED"}"#).unwrap();
        assert_eq!(odd.status, AutopilotStatus::Other);
        assert!(!odd.executed());
    }

    #[test]
    fn test_heartbeat_ack() {
        let ack: HeartbeatAck = serde_json::from_str(r#"{"status": "pulse_received"}"#).unwrap();
        assert!(ack.is_success());
    }

    #[test]
    fn test_health_ready() {
        let ready: HealthStatus = serde_json::from_str(r#"{"status": "READY"}"#).unwrap();
        assert!(ready.is_ready());
        let warming: HealthStatus =
            serde_json::from_str(r#"{"status": "INITIALIZING"}"#).unwrap();
        assert!(!warming.is_ready());
    }
}
