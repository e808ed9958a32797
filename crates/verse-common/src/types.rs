//! Core types for the Tradeverse control console.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::serde_util::{decimal_lenient, optional_decimal_lenient};

/// Execution mode for the trading backend.
///
/// `Manual` requires per-trade user confirmation; `Auto` lets the backend
/// evaluate and execute trades on a cycle while the client keeps a heartbeat
/// alive for the backend watchdog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradingMode {
    /// Every trade requires explicit user action.
    #[default]
    Manual,
    /// Backend runs decision cycles without per-trade confirmation.
    Auto,
}

impl TradingMode {
    /// Parse a mode from its wire representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "MANUAL" => Some(TradingMode::Manual),
            "AUTO" => Some(TradingMode::Auto),
            _ => None,
        }
    }

    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TradingMode::Manual => "MANUAL",
            TradingMode::Auto => "AUTO",
        }
    }
}

impl std::fmt::Display for TradingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Target environment for trading actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Environment {
    /// Simulated broker. Always reachable, reduced-capability session.
    #[default]
    Mock,
    /// Real brokerage connection. Requires an active broker link.
    Live,
}

impl Environment {
    /// Parse an environment from its wire representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "MOCK" => Some(Environment::Mock),
            "LIVE" => Some(Environment::Live),
            _ => None,
        }
    }

    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Mock => "MOCK",
            Environment::Live => "LIVE",
        }
    }

    /// Whether this environment targets a real brokerage.
    #[inline]
    pub fn is_live(&self) -> bool {
        matches!(self, Environment::Live)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Capability level derived from the current session.
///
/// Guest sessions hold a placeholder token for API-shape compatibility only.
/// Server-side authorization is the actual gate; the role exists so the
/// client can reject privileged actions without a round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Reduced-capability demo session with a placeholder token.
    #[default]
    Guest,
    /// Logged-in user.
    Authenticated,
    /// Operator allowed to toggle AUTO mode and switch environments.
    Privileged,
}

impl Role {
    /// Parse a role from its wire representation (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "guest" => Some(Role::Guest),
            "authenticated" | "user" => Some(Role::Authenticated),
            "privileged" | "operator" | "owner" => Some(Role::Privileged),
            _ => None,
        }
    }

    /// Whether this role may request mode or environment transitions.
    #[inline]
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Privileged)
    }

    /// Whether this role represents a real (non-guest) login.
    #[inline]
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Role::Guest)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Guest => "guest",
            Role::Authenticated => "authenticated",
            Role::Privileged => "privileged",
        };
        write!(f, "{s}")
    }
}

/// User profile as reported by `GET /api/settings`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    /// Backend user identifier.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Display name.
    #[serde(default)]
    pub user_name: Option<String>,
    /// Login email. Compared against the operator allow-list when the
    /// backend supplies no role claim.
    #[serde(default)]
    pub email: Option<String>,
    /// Broker link status string (broker-specific).
    #[serde(default)]
    pub status: Option<String>,
}

/// Last traded price for a symbol, from `GET /api/market/ltp/{symbol}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LtpQuote {
    /// Exchange-qualified symbol (e.g. "NSE:BANKNIFTY").
    pub symbol: String,
    /// Last traded price.
    #[serde(deserialize_with = "decimal_lenient")]
    pub last_price: Decimal,
}

/// One entry of the order book, from `GET /api/orders`.
///
/// The broker payload carries many more fields; only the ones the console
/// displays or keys on are decoded, everything else is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Broker order identifier.
    #[serde(default)]
    pub order_id: String,
    /// Traded symbol.
    #[serde(default)]
    pub tradingsymbol: String,
    /// BUY or SELL.
    #[serde(default)]
    pub transaction_type: String,
    /// Order quantity.
    #[serde(default)]
    pub quantity: u32,
    /// Broker status (COMPLETE, OPEN, REJECTED, ...).
    #[serde(default)]
    pub status: String,
    /// Average fill price, if filled.
    #[serde(default, deserialize_with = "optional_decimal_lenient")]
    pub average_price: Option<Decimal>,
    /// Broker timestamp, passed through verbatim.
    #[serde(default)]
    pub order_timestamp: Option<String>,
}

impl OrderRecord {
    /// Whether the broker reports this order as fully executed.
    pub fn is_complete(&self) -> bool {
        self.status.eq_ignore_ascii_case("COMPLETE")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_trading_mode_parse() {
        assert_eq!(TradingMode::parse("auto"), Some(TradingMode::Auto));
        assert_eq!(TradingMode::parse("MANUAL"), Some(TradingMode::Manual));
        assert_eq!(TradingMode::parse("paper"), None);
    }

    #[test]
    fn test_trading_mode_wire_format() {
        let json = serde_json::to_string(&TradingMode::Auto).unwrap();
        assert_eq!(json, "\"AUTO\"");
        let back: TradingMode = serde_json::from_str("\"MANUAL\"").unwrap();
        assert_eq!(back, TradingMode::Manual);
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("live"), Some(Environment::Live));
        assert_eq!(Environment::parse("MOCK"), Some(Environment::Mock));
        assert_eq!(Environment::parse("staging"), None);
        assert!(Environment::Live.is_live());
        assert!(!Environment::Mock.is_live());
    }

    #[test]
    fn test_role_capabilities() {
        assert!(Role::Privileged.is_privileged());
        assert!(!Role::Authenticated.is_privileged());
        assert!(!Role::Guest.is_privileged());
        assert!(Role::Authenticated.is_authenticated());
        assert!(!Role::Guest.is_authenticated());
    }

    #[test]
    fn test_role_parse_aliases() {
        assert_eq!(Role::parse("owner"), Some(Role::Privileged));
        assert_eq!(Role::parse("user"), Some(Role::Authenticated));
        assert_eq!(Role::parse("nobody"), None);
    }

    #[test]
    fn test_ltp_quote_number_payload() {
        let quote: LtpQuote =
            serde_json::from_str(r#"{"symbol": "NSE:NIFTY 50", "last_price": 22150.35}"#).unwrap();
        assert_eq!(quote.last_price, dec!(22150.35));
    }

    #[test]
    fn test_order_record_lenient_decode() {
        let order: OrderRecord = serde_json::from_str(
            r#"{
                "order_id": "240101000001",
                "tradingsymbol": "BANKNIFTY24JANFUT",
                "transaction_type": "BUY",
                "quantity": 15,
                "status": "COMPLETE",
                "average_price": "47210.55",
                "exchange": "NFO"
            }"#,
        )
        .unwrap();
        assert!(order.is_complete());
        assert_eq!(order.average_price, Some(dec!(47210.55)));
        assert_eq!(order.quantity, 15);
    }

    #[test]
    fn test_order_record_missing_fields() {
        let order: OrderRecord = serde_json::from_str(r#"{"order_id": "x"}"#).unwrap();
        assert!(!order.is_complete());
        assert!(order.average_price.is_none());
    }
}
