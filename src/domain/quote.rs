//! Canonical quote records for all instrument classes.
//!
//! Every source adapter converts its upstream payload into one of these
//! shapes before anything downstream sees it. Invariant shared by all of
//! them: when a previous price is known, `change == price - previous` and
//! `change_percent == change / previous * 100`; otherwise both are zero.

use serde::{Deserialize, Serialize};

/// Category of tradable asset, each with its own cadence and shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstrumentClass {
    Equity,
    Metal,
    Crypto,
    Fx,
}

impl InstrumentClass {
    /// Stable lowercase label for logs and metrics.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Equity => "equity",
            Self::Metal => "metal",
            Self::Crypto => "crypto",
            Self::Fx => "fx",
        }
    }
}

impl std::fmt::Display for InstrumentClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The common quote shape all instrument classes normalize into.
///
/// Gold and silver use this shape directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalQuote {
    /// Internal symbol identifier (e.g. "sh000001", "XAG").
    pub symbol: String,
    /// Human-readable instrument name as reported upstream.
    pub display_name: String,
    /// Latest price in the instrument's quote unit.
    pub price: f64,
    /// Absolute change against the previous reference price.
    pub change: f64,
    /// Percent change against the previous reference price.
    pub change_percent: f64,
    /// Local observation time (Unix ms).
    pub timestamp_ms: u64,
}

/// Equity or index quote with session fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityQuote {
    /// Internal symbol identifier.
    pub symbol: String,
    /// Instrument name from the payload.
    pub display_name: String,
    /// Current price.
    pub price: f64,
    /// Change against previous close.
    pub change: f64,
    /// Percent change against previous close.
    pub change_percent: f64,
    /// Session open price.
    pub open: f64,
    /// Previous session close. Never zero — zero-close records are dropped.
    pub prev_close: f64,
    /// Turnover rate in percent; zero when the source omits it.
    pub turnover_rate: f64,
    /// Local observation time (Unix ms).
    pub timestamp_ms: u64,
}

/// Crypto ticker quote, keyed by trading pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoQuote {
    /// Upstream trading pair (e.g. "btc_usdt").
    pub pair: String,
    /// Internal symbol (e.g. "BTC").
    pub symbol: String,
    /// Display name.
    pub display_name: String,
    /// Last traded price.
    pub price: f64,
    /// Absolute 24h change, derived from the reported percent.
    pub change_24h: f64,
    /// 24h percent change as reported upstream.
    pub change_percent_24h: f64,
    /// Local observation time (Unix ms).
    pub timestamp_ms: u64,
}

/// FX rate quote. `rate` mirrors `price`; `source_timestamp` preserves the
/// origin-reported update time as an opaque string, distinct from the local
/// fetch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FxQuote {
    /// Pair symbol (e.g. "USD/CNH").
    pub symbol: String,
    /// Display name.
    pub display_name: String,
    /// Current rate.
    pub price: f64,
    /// Absolute change against the previously observed rate.
    pub change: f64,
    /// Percent change against the previously observed rate.
    pub change_percent: f64,
    /// Base currency code.
    pub base_currency: String,
    /// Quote currency code.
    pub quote_currency: String,
    /// Mirror of `price` for consumers that speak "rate".
    pub rate: f64,
    /// Origin-reported update time, verbatim.
    pub source_timestamp: String,
    /// Local observation time (Unix ms).
    pub timestamp_ms: u64,
}

/// Compute `(change, change_percent)` of `price` against a previous
/// reference. Returns zeros when no previous value is known or the
/// reference is zero (upstream reports absolute values only).
pub fn change_against(price: f64, previous: Option<f64>) -> (f64, f64) {
    match previous {
        Some(prev) if prev != 0.0 => {
            let change = price - prev;
            (change, change / prev * 100.0)
        }
        _ => (0.0, 0.0),
    }
}

/// Current wall-clock time in Unix milliseconds.
pub fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
