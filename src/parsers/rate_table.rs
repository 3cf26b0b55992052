//! FX rate-table parser.
//!
//! The rate API reports absolute rates for every currency against the
//! base, never deltas:
//!
//! ```json
//! { "result": "success", "time_last_update_utc": "Fri, 21 Aug 2026 00:02:31 +0000",
//!   "base_code": "USD", "rates": { "CNH": 7.10, "EUR": 0.92, ... } }
//! ```
//!
//! Change and percent change are therefore diffed here against the
//! caller's previously observed rate — this is the only place in the
//! system that diff happens. The first observation has no baseline and
//! yields zeros.

use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::change_against;
use crate::error::ParseError;

/// Typed rate-table response schema.
#[derive(Debug, Deserialize)]
struct RateTableResponse {
    /// "success" on a good response; anything else fails the record.
    result: String,
    /// Origin-reported update time, kept verbatim for provenance.
    #[serde(default)]
    time_last_update_utc: String,
    /// Rates keyed by currency code.
    rates: HashMap<String, f64>,
}

/// One decoded rate observation for a single target currency.
#[derive(Debug, Clone, PartialEq)]
pub struct RateRecord {
    /// Absolute rate for the target currency.
    pub rate: f64,
    /// Change against `previous`; zero on the first observation.
    pub change: f64,
    /// Percent change against `previous`; zero on the first observation.
    pub change_percent: f64,
    /// Origin-reported update time, verbatim.
    pub source_timestamp: String,
}

/// Look up `target` in the response's rate table and diff against the
/// previously observed rate.
pub fn parse(body: &str, target: &str, previous: Option<f64>) -> Result<RateRecord, ParseError> {
    let response: RateTableResponse = serde_json::from_str(body)?;

    if response.result != "success" {
        return Err(ParseError::UpstreamStatus(response.result));
    }

    let rate = *response
        .rates
        .get(target)
        .ok_or_else(|| ParseError::MissingRate(target.to_string()))?;

    let (change, change_percent) = change_against(rate, previous);

    Ok(RateRecord {
        rate,
        change,
        change_percent,
        source_timestamp: response.time_last_update_utc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(rate: f64) -> String {
        format!(
            r#"{{"result":"success",
                 "time_last_update_utc":"Fri, 21 Aug 2026 00:02:31 +0000",
                 "base_code":"USD",
                 "rates":{{"CNH":{rate},"EUR":0.92}}}}"#
        )
    }

    #[test]
    fn first_observation_has_zero_change() {
        let record = parse(&body(7.10), "CNH", None).unwrap();
        assert!((record.rate - 7.10).abs() < 1e-9);
        assert_eq!(record.change, 0.0);
        assert_eq!(record.change_percent, 0.0);
        assert_eq!(record.source_timestamp, "Fri, 21 Aug 2026 00:02:31 +0000");
    }

    #[test]
    fn second_observation_diffs_against_baseline() {
        let record = parse(&body(7.15), "CNH", Some(7.10)).unwrap();
        assert!((record.change - 0.05).abs() < 1e-9);
        assert!((record.change_percent - 0.704_225_352).abs() < 1e-6);
    }

    #[test]
    fn missing_target_rejected() {
        let err = parse(&body(7.10), "JPY", None).unwrap_err();
        assert!(matches!(err, ParseError::MissingRate(code) if code == "JPY"));
    }

    #[test]
    fn unsuccessful_result_rejected() {
        let body = r#"{"result":"error","rates":{"CNH":7.1}}"#;
        assert!(matches!(
            parse(body, "CNH", None),
            Err(ParseError::UpstreamStatus(_))
        ));
    }

    #[test]
    fn malformed_body_rejected() {
        assert!(matches!(parse("{", "CNH", None), Err(ParseError::Json(_))));
    }
}
