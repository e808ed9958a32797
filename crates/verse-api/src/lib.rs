//! Tradeverse API client library.
//!
//! Provides a thin HTTP client for the Tradeverse backend:
//! - Bearer-token auth from a shared session token
//! - Per-mutation request IDs for backend deduplication
//! - Typed wire records for every consumed endpoint
//!
//! Used by `verse-console` (control core); the backend's trading
//! intelligence is opaque to this crate — it only speaks the wire format.

pub mod auth;
pub mod client;
pub mod market;
pub mod monitoring;
pub mod settings;
pub mod trading;
pub mod types;

// Re-export main types and clients
pub use client::{new_shared_token, ApiClient, ApiError, SharedToken, DEFAULT_BASE_URL};
pub use settings::{validate_trusted_ip, IpValidationError};
pub use types::{
    AutopilotReport, AutopilotStatus, BrokerCredentials, EmergencyAck, HealthStatus, HeartbeatAck,
    ModeAck, ObservatoryStatus, SettingsSnapshot, SettingsUpdate, StatusAck, TrustedIpList,
    UpdateAck,
};
