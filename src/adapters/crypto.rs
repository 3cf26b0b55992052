//! Crypto Ticker Source — One Instance per Trading Pair
//!
//! The exchange's ticker endpoint serves one pair per request, so each
//! pair gets its own source instance — and therefore its own TTL cache
//! and poller. Pair codes map to internal symbols through a static
//! table; an unconfigured pair falls back to the upper-cased base
//! currency.

use std::sync::Arc;

use async_trait::async_trait;

use super::http::HttpFetcher;
use crate::domain::{now_ms, CryptoQuote};
use crate::error::FetchError;
use crate::parsers::json_ticker;
use crate::ports::QuoteSource;

/// Known pairs and their display identities.
const PAIRS: &[(&str, &str, &str)] = &[
    ("btc_usdt", "BTC", "比特币"),
    ("eth_usdt", "ETH", "以太坊"),
];

/// Ticker source for a single trading pair.
pub struct CryptoTickerSource {
    fetcher: Arc<HttpFetcher>,
    base_url: String,
    pair: String,
    symbol: String,
    display: String,
}

impl CryptoTickerSource {
    pub fn new(fetcher: Arc<HttpFetcher>, base_url: impl Into<String>, pair: &str) -> Self {
        let (symbol, display) = PAIRS
            .iter()
            .find(|(code, _, _)| *code == pair)
            .map(|(_, symbol, display)| ((*symbol).to_string(), (*display).to_string()))
            .unwrap_or_else(|| {
                let base = pair.split('_').next().unwrap_or(pair).to_uppercase();
                (base.clone(), base)
            });

        Self {
            fetcher,
            base_url: base_url.into(),
            pair: pair.to_string(),
            symbol,
            display,
        }
    }

    /// The pair this instance polls.
    pub fn pair(&self) -> &str {
        &self.pair
    }

    fn decode_response(&self, body: &str) -> Result<CryptoQuote, FetchError> {
        let record = json_ticker::parse(body)?;
        Ok(CryptoQuote {
            pair: self.pair.clone(),
            symbol: self.symbol.clone(),
            display_name: self.display.clone(),
            price: record.price,
            change_24h: record.change_24h,
            change_percent_24h: record.change_percent_24h,
            timestamp_ms: now_ms(),
        })
    }
}

#[async_trait]
impl QuoteSource for CryptoTickerSource {
    type Output = CryptoQuote;

    fn name(&self) -> &'static str {
        "crypto_ticker"
    }

    async fn fetch(&self) -> Result<Self::Output, FetchError> {
        let url = format!("{}/ticker/{}", self.base_url, self.pair);
        let body = self.fetcher.get_text(&url, None).await?;
        self.decode_response(&body)
    }
}
