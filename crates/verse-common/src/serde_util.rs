//! Serde helpers for the Tradeverse wire format.
//!
//! The backend is inconsistent about numeric encoding: prices arrive as JSON
//! numbers from some brokers and as strings from others. These helpers accept
//! both so wire types don't have to care which broker is active.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

/// Deserialize a `Decimal` from either a JSON number or a string.
pub fn decimal_lenient<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => {
            Decimal::try_from(n).map_err(serde::de::Error::custom)
        }
        NumberOrString::String(s) => s.parse::<Decimal>().map_err(serde::de::Error::custom),
    }
}

/// Deserialize an `Option<Decimal>` from a JSON number, string, or null.
pub fn optional_decimal_lenient<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MaybeNumber {
        Number(f64),
        String(String),
    }

    let opt: Option<MaybeNumber> = Option::deserialize(deserializer)?;
    match opt {
        Some(MaybeNumber::Number(n)) => Decimal::try_from(n)
            .map(Some)
            .map_err(serde::de::Error::custom),
        Some(MaybeNumber::String(s)) if !s.is_empty() => s
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Price {
        #[serde(deserialize_with = "super::decimal_lenient")]
        value: rust_decimal::Decimal,
    }

    #[derive(Deserialize)]
    struct MaybePrice {
        #[serde(default, deserialize_with = "super::optional_decimal_lenient")]
        value: Option<rust_decimal::Decimal>,
    }

    #[test]
    fn test_decimal_from_number() {
        let p: Price = serde_json::from_str(r#"{"value": 48123.5}"#).unwrap();
        assert_eq!(p.value, dec!(48123.5));
    }

    #[test]
    fn test_decimal_from_string() {
        let p: Price = serde_json::from_str(r#"{"value": "48123.50"}"#).unwrap();
        assert_eq!(p.value, dec!(48123.50));
    }

    #[test]
    fn test_optional_decimal_null() {
        let p: MaybePrice = serde_json::from_str(r#"{"value": null}"#).unwrap();
        assert!(p.value.is_none());
    }

    #[test]
    fn test_optional_decimal_empty_string() {
        let p: MaybePrice = serde_json::from_str(r#"{"value": ""}"#).unwrap();
        assert!(p.value.is_none());
    }

    #[test]
    fn test_optional_decimal_present() {
        let p: MaybePrice = serde_json::from_str(r#"{"value": "101.25"}"#).unwrap();
        assert_eq!(p.value, Some(dec!(101.25)));
    }
}
