//! Forgiving field decoders for form-style payloads
//!
//! Ledger clients post whatever their inputs hold: numbers as strings,
//! empty strings for untouched amount fields and full timestamps where a
//! date is meant. An amount that does not read as a number counts as 0.

use chrono::{DateTime, NaiveDate};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::str::FromStr;

fn decimal_of(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .ok()
            .or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        Value::Bool(b) => Some(if *b { Decimal::ONE } else { Decimal::ZERO }),
        _ => None,
    }
}

/// Amount field; anything unreadable is 0
pub fn amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(decimal_of(&value).unwrap_or(Decimal::ZERO))
}

/// Whole number field; anything unreadable is absent
pub fn whole_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(decimal_of(&value)
        .filter(|d| d.fract().is_zero())
        .and_then(|d| d.to_i64()))
}

/// Calendar date given as `YYYY-MM-DD` or as an RFC 3339 timestamp
pub fn date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    let Some(raw) = raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    if let Ok(date) = NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
        return Ok(Some(date));
    }
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| Some(ts.date_naive()))
        .map_err(|_| serde::de::Error::custom(format!("invalid date: {}", raw)))
}

/// Optional text; blank strings are absent
pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "amount")]
        cash: Decimal,
        #[serde(default, deserialize_with = "whole_number")]
        no: Option<i64>,
        #[serde(default, deserialize_with = "date")]
        date: Option<NaiveDate>,
    }

    fn probe(json: &str) -> Probe {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_amounts_coerce_like_form_input() {
        assert_eq!(probe(r#"{"cash": "250.50"}"#).cash, dec!(250.50));
        assert_eq!(probe(r#"{"cash": 75}"#).cash, dec!(75));
        assert_eq!(probe(r#"{"cash": ""}"#).cash, dec!(0));
        assert_eq!(probe(r#"{"cash": "abc"}"#).cash, dec!(0));
        assert_eq!(probe(r#"{"cash": null}"#).cash, dec!(0));
        assert_eq!(probe(r#"{}"#).cash, dec!(0));
    }

    #[test]
    fn test_voucher_numbers_accept_strings() {
        assert_eq!(probe(r#"{"no": "12"}"#).no, Some(12));
        assert_eq!(probe(r#"{"no": 7}"#).no, Some(7));
        assert_eq!(probe(r#"{"no": "12.5"}"#).no, None);
        assert_eq!(probe(r#"{"no": ""}"#).no, None);
    }

    #[test]
    fn test_dates_accept_timestamps() {
        let expected = NaiveDate::from_ymd_opt(2024, 6, 15);
        assert_eq!(probe(r#"{"date": "2024-06-15"}"#).date, expected);
        assert_eq!(probe(r#"{"date": "2024-06-15T00:00:00.000Z"}"#).date, expected);
        assert_eq!(probe(r#"{"date": ""}"#).date, None);
    }
}
