//! Crypto exchange ticker parser.
//!
//! The exchange reports numbers as JSON strings:
//!
//! ```json
//! { "last": "70622.2", "high24hr": "76786.5", "low24hr": "70122",
//!   "percentChange": "-7.45", "baseVolume": "12345.67" }
//! ```
//!
//! The 24h change is reported as a percentage only; the absolute change
//! is derived here by multiplying against the price.

use serde::Deserialize;

use crate::error::{ParseError, ValidationError};

/// Typed ticker response schema. Unknown fields are ignored; missing
/// required fields fail the whole record.
#[derive(Debug, Deserialize)]
struct TickerResponse {
    /// Last traded price, as a decimal string.
    last: String,
    /// 24h percent change, as a decimal string.
    #[serde(rename = "percentChange")]
    percent_change: String,
}

/// One decoded ticker record.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonTickerRecord {
    /// Last traded price. Guaranteed non-zero.
    pub price: f64,
    /// Absolute 24h change (`price * percent / 100`).
    pub change_24h: f64,
    /// 24h percent change as reported.
    pub change_percent_24h: f64,
}

fn numeric(field: &'static str, raw: &str) -> Result<f64, ValidationError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ValidationError::NonNumeric {
            field,
            value: raw.to_string(),
        })
}

/// Decode a ticker response body.
pub fn parse(body: &str) -> Result<JsonTickerRecord, ParseError> {
    let response: TickerResponse = serde_json::from_str(body)?;

    let price = numeric("last", &response.last)?;
    if price == 0.0 {
        return Err(ValidationError::ZeroPrice.into());
    }
    let change_percent_24h = numeric("percentChange", &response.percent_change)?;

    Ok(JsonTickerRecord {
        price,
        change_24h: price * change_percent_24h / 100.0,
        change_percent_24h,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_ticker() {
        let body = r#"{"last":"70622.2","high24hr":"76786.5","low24hr":"70122",
                       "percentChange":"-7.45","baseVolume":"12345.67"}"#;
        let record = parse(body).unwrap();
        assert!((record.price - 70622.2).abs() < 1e-9);
        assert!((record.change_percent_24h + 7.45).abs() < 1e-9);
        assert!((record.change_24h - 70622.2 * -7.45 / 100.0).abs() < 1e-6);
    }

    #[test]
    fn non_numeric_price_rejected() {
        let body = r#"{"last":"n/a","percentChange":"1.0"}"#;
        assert!(matches!(
            parse(body),
            Err(ParseError::Invalid(ValidationError::NonNumeric { field: "last", .. }))
        ));
    }

    #[test]
    fn zero_price_rejected() {
        let body = r#"{"last":"0","percentChange":"1.0"}"#;
        assert!(matches!(
            parse(body),
            Err(ParseError::Invalid(ValidationError::ZeroPrice))
        ));
    }

    #[test]
    fn missing_field_is_parse_error() {
        assert!(matches!(parse(r#"{"last":"1.0"}"#), Err(ParseError::Json(_))));
    }

    #[test]
    fn malformed_body_is_parse_error() {
        assert!(matches!(parse("not json"), Err(ParseError::Json(_))));
    }
}
