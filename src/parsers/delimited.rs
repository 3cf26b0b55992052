//! Tilde-delimited ticker parser (equities, indices, ETFs).
//!
//! The upstream answers a batched query with one script-style assignment
//! per symbol:
//!
//! ```text
//! v_sh000001="1~上证指数~000001~3245.67~3200.00~3210.00~...";
//! v_usDJI="200~道琼斯~.DJI~38001.2~37950.0~37960.1~...";
//! ```
//!
//! Field positions are fixed: name(1), current price(3), previous
//! close(4), open(5), turnover rate(38). Index 4 is the previous close
//! and index 5 the open — reversed from what most feeds do, but that is
//! this source's format.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{ParseError, ValidationError};

/// Minimum fields for a full equity record including turnover rate (38).
pub const EQUITY_MIN_FIELDS: usize = 39;

/// Minimum fields when only price/prev-close/open are needed (ETF, index).
pub const PRICE_MIN_FIELDS: usize = 6;

/// One decoded ticker record with derived change fields.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerFields {
    /// Instrument name from the payload (field 1).
    pub name: String,
    /// Current price (field 3).
    pub price: f64,
    /// Previous close (field 4). Guaranteed non-zero.
    pub prev_close: f64,
    /// Session open (field 5).
    pub open: f64,
    /// `price - prev_close`.
    pub change: f64,
    /// `change / prev_close * 100`.
    pub change_percent: f64,
    /// Turnover rate in percent (field 38); zero when absent or unparsable.
    pub turnover_rate: f64,
}

fn wrapper_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"v_(\w+)\s*=\s*"([^"]*)""#).expect("static pattern"))
}

/// Extract every `v_<key>="payload"` record from a batched response.
///
/// Keys the caller does not recognize are simply left unused; an empty
/// map means the response carried no parsable wrapper at all.
pub fn parse_response(text: &str) -> HashMap<String, String> {
    wrapper_pattern()
        .captures_iter(text)
        .map(|cap| (cap[1].to_string(), cap[2].to_string()))
        .collect()
}

fn numeric(field: &'static str, raw: &str) -> Result<f64, ValidationError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ValidationError::NonNumeric {
            field,
            value: raw.to_string(),
        })
}

/// Decode one tilde-delimited payload into typed fields.
///
/// `min_fields` is source-specific: a full equity record needs
/// [`EQUITY_MIN_FIELDS`], a price-only read needs [`PRICE_MIN_FIELDS`].
/// Fails on short records, non-numeric price or previous close, and a
/// previous close of exactly zero (division by zero computing percent).
pub fn parse_payload(payload: &str, min_fields: usize) -> Result<TickerFields, ParseError> {
    let parts: Vec<&str> = payload.split('~').collect();
    if parts.len() < min_fields {
        return Err(ParseError::NotEnoughFields {
            expected: min_fields,
            actual: parts.len(),
        });
    }

    let name = parts[1].to_string();
    let price = numeric("price", parts[3])?;
    let prev_close = numeric("prev_close", parts[4])?;
    let open = numeric("open", parts[5]).unwrap_or(0.0);

    if prev_close == 0.0 {
        return Err(ValidationError::ZeroPreviousClose.into());
    }

    let change = price - prev_close;
    let change_percent = change / prev_close * 100.0;

    let turnover_rate = parts
        .get(38)
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(TickerFields {
        name,
        price,
        prev_close,
        open,
        change,
        change_percent,
        turnover_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A 39-field payload in the upstream's layout, with the given head
    /// fields and turnover rate in the last slot.
    fn payload_39(name: &str, price: &str, prev: &str, open: &str, turnover: &str) -> String {
        let mut parts = vec!["1".to_string(); 39];
        parts[1] = name.to_string();
        parts[2] = "000001".to_string();
        parts[3] = price.to_string();
        parts[4] = prev.to_string();
        parts[5] = open.to_string();
        parts[38] = turnover.to_string();
        parts.join("~")
    }

    #[test]
    fn full_equity_record() {
        let payload = payload_39("上证指数", "3245.67", "3200.00", "3210.00", "1.23");
        let fields = parse_payload(&payload, EQUITY_MIN_FIELDS).unwrap();
        assert_eq!(fields.name, "上证指数");
        assert!((fields.price - 3245.67).abs() < 1e-9);
        assert!((fields.prev_close - 3200.00).abs() < 1e-9);
        assert!((fields.open - 3210.00).abs() < 1e-9);
        assert!((fields.change - 45.67).abs() < 1e-9);
        assert!((fields.change_percent - 1.427_187_5).abs() < 1e-6);
        assert!((fields.turnover_rate - 1.23).abs() < 1e-9);
    }

    #[test]
    fn batched_response_yields_all_keys() {
        let text = concat!(
            "v_sh000001=\"1~上证指数~000001~10~9~9.5\";\n",
            "v_usDJI = \"200~道琼斯~.DJI~38001.2~37950.0~37960.1\";",
        );
        let records = parse_response(text);
        assert_eq!(records.len(), 2);
        assert!(records["sh000001"].starts_with("1~上证指数"));
        assert!(records["usDJI"].starts_with("200~道琼斯"));
    }

    #[test]
    fn no_wrapper_yields_empty_map() {
        assert!(parse_response("<html>blocked</html>").is_empty());
    }

    #[test]
    fn short_record_rejected() {
        let err = parse_payload("1~x~c~10~9", PRICE_MIN_FIELDS).unwrap_err();
        assert!(matches!(
            err,
            ParseError::NotEnoughFields { expected: 6, actual: 5 }
        ));
    }

    #[test]
    fn zero_prev_close_rejected() {
        let payload = payload_39("x", "10.0", "0", "9.5", "1");
        let err = parse_payload(&payload, EQUITY_MIN_FIELDS).unwrap_err();
        assert!(matches!(
            err,
            ParseError::Invalid(ValidationError::ZeroPreviousClose)
        ));
    }

    #[test]
    fn non_numeric_price_rejected() {
        let payload = payload_39("x", "n/a", "9", "9.5", "1");
        let err = parse_payload(&payload, EQUITY_MIN_FIELDS).unwrap_err();
        assert!(matches!(
            err,
            ParseError::Invalid(ValidationError::NonNumeric { field: "price", .. })
        ));
    }

    #[test]
    fn missing_turnover_defaults_to_zero() {
        let fields = parse_payload("1~x~c~10~9~9.5", PRICE_MIN_FIELDS).unwrap();
        assert_eq!(fields.turnover_rate, 0.0);
        assert!((fields.change - 1.0).abs() < 1e-9);
    }
}
