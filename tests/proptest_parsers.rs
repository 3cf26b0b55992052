//! Property-Based Tests — Parser and Change-law Invariants
//!
//! Uses `proptest` to verify that every parser maintains the change
//! arithmetic law and rejects malformed payloads across random inputs.

use proptest::prelude::*;

use quotewall::domain::change_against;
use quotewall::parsers::delimited::{self, EQUITY_MIN_FIELDS, PRICE_MIN_FIELDS};
use quotewall::parsers::{json_ticker, rate_table};

/// Build a full-width delimited equity payload with the given price
/// and previous close planted at their field positions.
fn equity_payload(price: f64, prev_close: f64) -> String {
    let mut fields: Vec<String> = (0..EQUITY_MIN_FIELDS).map(|i| i.to_string()).collect();
    fields[1] = "测试指数".to_string();
    fields[3] = format!("{price}");
    fields[4] = format!("{prev_close}");
    fields[5] = format!("{price}");
    fields[38] = "1.5".to_string();
    fields.join("~")
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-6 * a.abs().max(b.abs()).max(1.0)
}

// ── Change Arithmetic ───────────────────────────────────────

proptest! {
    /// change = price - previous, percent = change / previous * 100.
    #[test]
    fn change_law_holds(
        price in 0.01f64..1.0e6,
        previous in 0.01f64..1.0e6,
    ) {
        let (change, change_percent) = change_against(price, Some(previous));
        prop_assert!(close(change, price - previous));
        prop_assert!(close(change_percent, (price - previous) / previous * 100.0));
    }

    /// With no previous value the deltas collapse to zero rather than
    /// a fabricated number.
    #[test]
    fn missing_previous_yields_zero_deltas(price in 0.01f64..1.0e6) {
        prop_assert_eq!(change_against(price, None), (0.0, 0.0));
        prop_assert_eq!(change_against(price, Some(0.0)), (0.0, 0.0));
    }
}

// ── Delimited Equity Payloads ───────────────────────────────

proptest! {
    /// Parsed price matches the planted field and the computed change
    /// obeys the change law.
    #[test]
    fn delimited_parse_preserves_change_law(
        price in 0.01f64..1.0e6,
        prev_close in 0.01f64..1.0e6,
    ) {
        let fields =
            delimited::parse_payload(&equity_payload(price, prev_close), EQUITY_MIN_FIELDS)
                .unwrap();
        prop_assert!(close(fields.price, price));
        prop_assert!(close(fields.change, price - prev_close));
        prop_assert!(close(
            fields.change_percent,
            (price - prev_close) / prev_close * 100.0
        ));
    }

    /// Payloads narrower than the minimum field count never parse.
    #[test]
    fn delimited_rejects_short_payloads(width in 1usize..PRICE_MIN_FIELDS) {
        let payload = vec!["1.0"; width].join("~");
        prop_assert!(delimited::parse_payload(&payload, PRICE_MIN_FIELDS).is_err());
    }

    /// A zero previous close is rejected instead of dividing by zero.
    #[test]
    fn delimited_rejects_zero_prev_close(price in 0.01f64..1.0e6) {
        let payload = equity_payload(price, 0.0);
        prop_assert!(delimited::parse_payload(&payload, EQUITY_MIN_FIELDS).is_err());
    }
}

// ── JSON Crypto Ticker ──────────────────────────────────────

proptest! {
    /// The absolute 24h change is derived from the percent field.
    #[test]
    fn json_ticker_change_derivation(
        last in 0.01f64..1.0e6,
        percent in -99.0f64..99.0,
    ) {
        let body = format!(r#"{{"last":"{last}","percentChange":"{percent}"}}"#);
        let record = json_ticker::parse(&body).unwrap();
        prop_assert!(close(record.price, last));
        prop_assert!(close(record.change_24h, last * percent / 100.0));
        prop_assert!(close(record.change_percent_24h, percent));
    }
}

// ── FX Rate Table ───────────────────────────────────────────

proptest! {
    /// Rate deltas are diffed against the supplied previous rate.
    #[test]
    fn rate_table_diffs_against_previous(
        rate in 0.01f64..1.0e3,
        previous in 0.01f64..1.0e3,
    ) {
        let body = format!(r#"{{"result":"success","rates":{{"CNH":{rate}}}}}"#);
        let record = rate_table::parse(&body, "CNH", Some(previous)).unwrap();
        prop_assert!(close(record.rate, rate));
        prop_assert!(close(record.change, rate - previous));
    }

    /// Without a previous rate the deltas are zero.
    #[test]
    fn rate_table_first_observation_zero_deltas(rate in 0.01f64..1.0e3) {
        let body = format!(r#"{{"result":"success","rates":{{"CNH":{rate}}}}}"#);
        let record = rate_table::parse(&body, "CNH", None).unwrap();
        prop_assert_eq!(record.change, 0.0);
        prop_assert_eq!(record.change_percent, 0.0);
    }
}
