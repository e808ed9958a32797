//! Market data endpoints: last traded price and the order book.
//!
//! Both endpoints are public on the backend; the bearer token is still
//! attached when present so the backend can scope results per user.

use verse_common::{LtpQuote, OrderRecord};

use crate::client::{ApiClient, ApiError};

impl ApiClient {
    /// Fetch the last traded price for a symbol
    /// (`GET /api/market/ltp/{symbol}`).
    ///
    /// The symbol may be exchange-qualified ("NSE:BANKNIFTY"); it is
    /// percent-encoded into the path.
    pub async fn ltp(&self, symbol: &str) -> Result<LtpQuote, ApiError> {
        let encoded = encode_path_segment(symbol);
        self.get_json(&format!("/api/market/ltp/{encoded}")).await
    }

    /// Fetch the order book (`GET /api/orders`).
    pub async fn orders(&self) -> Result<Vec<OrderRecord>, ApiError> {
        self.get_json("/api/orders").await
    }
}

/// Percent-encode the characters that can appear in exchange-qualified
/// symbols (colons and spaces, e.g. "NSE:NIFTY 50").
fn encode_path_segment(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            ':' => out.push_str("%3A"),
            ' ' => out.push_str("%20"),
            '/' => out.push_str("%2F"),
            _ => out.push(c),
        }
    }
    out
}
