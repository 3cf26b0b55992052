//! Comma-delimited quote-center parser (spot metals).
//!
//! The realtime endpoint answers with a single script assignment:
//!
//! ```text
//! var hq_str = "现货白银,0,7.43,7.50,7.55,7.40,...,2026-08-21,14:30:05,...,0.07,0.94,...";
//! ```
//!
//! At least 36 comma-separated fields are required. Positions: name(0),
//! previous close(2), price(3), high(4), low(5), date(30), time(31),
//! change(34), change percent(35). The upstream reports change and
//! percent itself, so nothing is re-derived here.

use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::Regex;

use crate::domain::now_ms;
use crate::error::{ParseError, ValidationError};

/// Minimum comma-separated fields for a usable record.
pub const MIN_FIELDS: usize = 36;

/// One decoded quote-center record. Prices are in the upstream's unit
/// (CNY per gram for the metal instruments).
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteCenterRecord {
    /// Instrument name (field 0).
    pub name: String,
    /// Previous close (field 2).
    pub prev_close: f64,
    /// Current price (field 3). Guaranteed non-zero.
    pub price: f64,
    /// Session high (field 4).
    pub high: f64,
    /// Session low (field 5).
    pub low: f64,
    /// Change as reported upstream (field 34).
    pub change: f64,
    /// Percent change as reported upstream (field 35).
    pub change_percent: f64,
    /// Timestamp synthesized from the date(30) + time(31) fields,
    /// falling back to the local clock when unparsable.
    pub timestamp_ms: u64,
}

fn wrapper_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"var hq_str\s*=\s*"([^"]*)""#).expect("static pattern"))
}

fn numeric_or_zero(raw: &str) -> f64 {
    raw.trim().parse::<f64>().unwrap_or(0.0)
}

/// Combine the record's date and time fields into Unix milliseconds.
fn synthesize_timestamp(date: &str, time: &str) -> Option<u64> {
    let combined = format!("{} {}", date.trim(), time.trim());
    let naive = NaiveDateTime::parse_from_str(&combined, "%Y-%m-%d %H:%M:%S").ok()?;
    let millis = naive.and_utc().timestamp_millis();
    (millis > 0).then_some(millis as u64)
}

/// Decode a quote-center realtime response.
pub fn parse(text: &str) -> Result<QuoteCenterRecord, ParseError> {
    let captured = wrapper_pattern()
        .captures(text)
        .ok_or(ParseError::MissingPayload)?;

    let parts: Vec<&str> = captured[1].split(',').collect();
    if parts.len() < MIN_FIELDS {
        return Err(ParseError::NotEnoughFields {
            expected: MIN_FIELDS,
            actual: parts.len(),
        });
    }

    let price = parts[3]
        .trim()
        .parse::<f64>()
        .map_err(|_| ValidationError::NonNumeric {
            field: "price",
            value: parts[3].to_string(),
        })?;
    if price == 0.0 {
        return Err(ValidationError::ZeroPrice.into());
    }

    Ok(QuoteCenterRecord {
        name: parts[0].to_string(),
        prev_close: numeric_or_zero(parts[2]),
        price,
        high: numeric_or_zero(parts[4]),
        low: numeric_or_zero(parts[5]),
        change: numeric_or_zero(parts[34]),
        change_percent: numeric_or_zero(parts[35]),
        timestamp_ms: synthesize_timestamp(parts[30], parts[31]).unwrap_or_else(now_ms),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A 36-field response body with the named slots filled in.
    fn response(name: &str, prev: &str, price: &str, slots: &[(usize, &str)]) -> String {
        let mut parts = vec!["0".to_string(); MIN_FIELDS];
        parts[0] = name.to_string();
        parts[2] = prev.to_string();
        parts[3] = price.to_string();
        for (idx, value) in slots {
            parts[*idx] = (*value).to_string();
        }
        format!("var hq_str = \"{}\";", parts.join(","))
    }

    #[test]
    fn full_record() {
        let text = response(
            "现货白银",
            "7.43",
            "7.50",
            &[
                (4, "7.55"),
                (5, "7.40"),
                (30, "2026-08-21"),
                (31, "14:30:05"),
                (34, "0.07"),
                (35, "0.94"),
            ],
        );
        let record = parse(&text).unwrap();
        assert_eq!(record.name, "现货白银");
        assert!((record.price - 7.50).abs() < 1e-9);
        assert!((record.prev_close - 7.43).abs() < 1e-9);
        assert!((record.change - 0.07).abs() < 1e-9);
        assert!((record.change_percent - 0.94).abs() < 1e-9);
        // 2026-08-21 14:30:05 UTC
        assert_eq!(record.timestamp_ms, 1_787_322_605_000);
    }

    #[test]
    fn unparsable_date_falls_back_to_now() {
        let before = now_ms();
        let text = response("x", "1", "2", &[(30, "soon"), (31, "ish")]);
        let record = parse(&text).unwrap();
        assert!(record.timestamp_ms >= before);
    }

    #[test]
    fn missing_wrapper_rejected() {
        assert!(matches!(
            parse("alert('nope')"),
            Err(ParseError::MissingPayload)
        ));
    }

    #[test]
    fn short_record_rejected() {
        let text = "var hq_str = \"a,b,c\";";
        assert!(matches!(
            parse(text),
            Err(ParseError::NotEnoughFields { expected: 36, actual: 3 })
        ));
    }

    #[test]
    fn zero_price_rejected() {
        let text = response("x", "7.43", "0", &[]);
        assert!(matches!(
            parse(&text),
            Err(ParseError::Invalid(ValidationError::ZeroPrice))
        ));
    }

    #[test]
    fn non_numeric_price_rejected() {
        let text = response("x", "7.43", "--", &[]);
        assert!(matches!(
            parse(&text),
            Err(ParseError::Invalid(ValidationError::NonNumeric { .. }))
        ));
    }
}
