//! Settings endpoints: environment, broker credentials, mode, trusted IPs.

use serde_json::json;
use thiserror::Error;

use verse_common::TradingMode;

use crate::client::{ApiClient, ApiError};
use crate::types::{ModeAck, SettingsSnapshot, SettingsUpdate, StatusAck, TrustedIpList, UpdateAck};

/// Client-side rejection of a trusted-IP edit, raised before any network
/// call is made.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IpValidationError {
    #[error("invalid IP address format: {0}")]
    InvalidFormat(String),

    #[error("IP address already trusted: {0}")]
    Duplicate(String),
}

/// Validate a candidate trusted IP against the current list.
///
/// Rejects malformed dotted-quad input and duplicates locally; the backend
/// performs its own validation but the console never sends a request it can
/// already tell is invalid.
pub fn validate_trusted_ip(current: &[String], candidate: &str) -> Result<(), IpValidationError> {
    let trimmed = candidate.trim();
    if trimmed.parse::<std::net::Ipv4Addr>().is_err() {
        return Err(IpValidationError::InvalidFormat(trimmed.to_string()));
    }
    if current.iter().any(|ip| ip == trimmed) {
        return Err(IpValidationError::Duplicate(trimmed.to_string()));
    }
    Ok(())
}

impl ApiClient {
    /// Fetch the current connectivity settings (`GET /api/settings`).
    pub async fn get_settings(&self) -> Result<SettingsSnapshot, ApiError> {
        self.get_json("/api/settings").await
    }

    /// Merge runtime settings (`POST /api/settings/update`).
    ///
    /// A success ack can still carry `broker_connected: false` when the
    /// backend could not verify the broker link; callers gate on both.
    pub async fn update_settings(&self, update: &SettingsUpdate) -> Result<UpdateAck, ApiError> {
        self.post_json("/api/settings/update", update).await
    }

    /// Request an execution-mode transition (`POST /api/settings/mode`).
    pub async fn set_mode(&self, mode: TradingMode) -> Result<ModeAck, ApiError> {
        self.post_json("/api/settings/mode", &json!({ "mode": mode }))
            .await
    }

    /// Fetch the trusted-IP allow-list (`GET /api/settings/trusted-ips`).
    pub async fn trusted_ips(&self) -> Result<TrustedIpList, ApiError> {
        self.get_json("/api/settings/trusted-ips").await
    }

    /// Add a trusted IP (`POST /api/settings/trusted-ips/add`).
    ///
    /// The caller is expected to have run [`validate_trusted_ip`] first.
    pub async fn add_trusted_ip(&self, ip: &str) -> Result<StatusAck, ApiError> {
        self.post_json("/api/settings/trusted-ips/add", &json!({ "ip_address": ip }))
            .await
    }

    /// Remove a trusted IP (`POST /api/settings/trusted-ips/remove`).
    pub async fn remove_trusted_ip(&self, ip: &str) -> Result<StatusAck, ApiError> {
        self.post_json(
            "/api/settings/trusted-ips/remove",
            &json!({ "ip_address": ip }),
        )
        .await
    }

    /// Disconnect the named broker (`POST /api/settings/disconnect`).
    pub async fn disconnect_broker(&self, broker: &str) -> Result<StatusAck, ApiError> {
        self.post_json("/api/settings/disconnect", &json!({ "broker": broker }))
            .await
    }
}
