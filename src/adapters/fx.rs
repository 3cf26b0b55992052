//! FX REST Source — Rate Table Endpoint with Shared Baseline
//!
//! The rate API reports absolute rates only, so change fields are
//! diffed against the last observed rate. That baseline is shared with
//! the streaming failover controller: whichever path delivers a rate
//! records it, and the next delta — from either path — is computed
//! against the same reference.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::http::HttpFetcher;
use crate::domain::{now_ms, FxQuote};
use crate::error::FetchError;
use crate::parsers::rate_table;
use crate::ports::QuoteSource;

/// Pair identity constants for the one configured FX instrument.
pub const FX_SYMBOL: &str = "USD/CNH";
pub const FX_DISPLAY_NAME: &str = "美元/离岸人民币";
pub const FX_BASE_CURRENCY: &str = "USD";

/// Last observed rate, shared between the REST source and the streaming
/// controller so both diff against the same reference.
#[derive(Debug, Default)]
pub struct RateBaseline {
    rate: Mutex<Option<f64>>,
}

impl RateBaseline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current baseline, if any rate has ever been observed.
    pub fn get(&self) -> Option<f64> {
        match self.rate.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Record a newly observed rate as the next baseline.
    pub fn record(&self, rate: f64) {
        match self.rate.lock() {
            Ok(mut guard) => *guard = Some(rate),
            Err(poisoned) => *poisoned.into_inner() = Some(rate),
        }
    }
}

/// Build the canonical FX quote shape from rate components.
pub fn fx_quote(rate: f64, change: f64, change_percent: f64, source_timestamp: String) -> FxQuote {
    FxQuote {
        symbol: FX_SYMBOL.to_string(),
        display_name: FX_DISPLAY_NAME.to_string(),
        price: rate,
        change,
        change_percent,
        base_currency: FX_BASE_CURRENCY.to_string(),
        quote_currency: quote_currency_of(FX_SYMBOL),
        rate,
        source_timestamp,
        timestamp_ms: now_ms(),
    }
}

fn quote_currency_of(symbol: &str) -> String {
    symbol.split('/').nth(1).unwrap_or(symbol).to_string()
}

/// REST source for the FX rate table.
pub struct FxRestSource {
    fetcher: Arc<HttpFetcher>,
    url: String,
    target: String,
    baseline: Arc<RateBaseline>,
}

impl FxRestSource {
    pub fn new(
        fetcher: Arc<HttpFetcher>,
        url: impl Into<String>,
        target: impl Into<String>,
        baseline: Arc<RateBaseline>,
    ) -> Self {
        Self {
            fetcher,
            url: url.into(),
            target: target.into(),
            baseline,
        }
    }

    fn decode_response(&self, body: &str) -> Result<FxQuote, FetchError> {
        let record = rate_table::parse(body, &self.target, self.baseline.get())?;
        self.baseline.record(record.rate);
        Ok(fx_quote(
            record.rate,
            record.change,
            record.change_percent,
            record.source_timestamp,
        ))
    }
}

#[async_trait]
impl QuoteSource for FxRestSource {
    type Output = FxQuote;

    fn name(&self) -> &'static str {
        "fx_rest"
    }

    async fn fetch(&self) -> Result<Self::Output, FetchError> {
        let body = self.fetcher.get_text(&self.url, None).await?;
        self.decode_response(&body)
    }
}
