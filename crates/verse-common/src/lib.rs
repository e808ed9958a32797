//! Shared types for the Tradeverse control console.
//!
//! This crate contains:
//! - Core enums (TradingMode, Environment, Role)
//! - Wire records shared between the API client and the console
//!   (orders, quotes, user profile)
//! - Serde helpers for lenient decimal decoding
//!
//! CRITICAL: All prices use `rust_decimal::Decimal`. NEVER use f64 for
//! financial math.

pub mod serde_util;
pub mod types;

pub use types::{
    Environment, LtpQuote, OrderRecord, Role, TradingMode, UserProfile,
};
