//! Precious Metals Sources — Gold ETF and Spot Quote Center
//!
//! Gold rides the delimited-ticker upstream's gold ETF (sh518880),
//! whose traded unit is one hundredth of a gram; prices are rescaled to
//! CNY per gram here. Silver comes from the quote-center realtime
//! endpoint which already reports CNY per gram and demands a referer
//! header. Both upstreams respond in GBK.

use std::sync::Arc;

use async_trait::async_trait;

use super::http::HttpFetcher;
use crate::domain::{now_ms, CanonicalQuote};
use crate::error::FetchError;
use crate::parsers::{delimited, quote_center};
use crate::ports::QuoteSource;

/// One ETF share corresponds to 0.01 gram of gold.
const GRAMS_PER_ETF_SHARE: f64 = 0.01;

const GOLD_ETF_CODE: &str = "sh518880";

/// Quote-center instrument code for spot silver (XAG).
pub const SILVER_SPOT_CODE: &str = "JO_92232";

/// Quote-center instrument code for spot gold (XAU).
pub const GOLD_SPOT_CODE: &str = "JO_92233";

/// Gold price via the exchange-traded fund, rescaled to CNY per gram.
pub struct GoldEtfSource {
    fetcher: Arc<HttpFetcher>,
    base_url: String,
}

impl GoldEtfSource {
    pub fn new(fetcher: Arc<HttpFetcher>, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }

    fn decode_response(text: &str) -> Result<CanonicalQuote, FetchError> {
        let payloads = delimited::parse_response(text);
        let payload = payloads
            .get(GOLD_ETF_CODE)
            .ok_or(crate::error::ParseError::MissingPayload)?;
        let fields = delimited::parse_payload(payload, delimited::PRICE_MIN_FIELDS)?;

        // ETF price is CNY per 0.01 g; percent change survives rescaling.
        Ok(CanonicalQuote {
            symbol: "SH518880".to_string(),
            display_name: "黄金现价".to_string(),
            price: fields.price / GRAMS_PER_ETF_SHARE,
            change: fields.change / GRAMS_PER_ETF_SHARE,
            change_percent: fields.change_percent,
            timestamp_ms: now_ms(),
        })
    }
}

#[async_trait]
impl QuoteSource for GoldEtfSource {
    type Output = CanonicalQuote;

    fn name(&self) -> &'static str {
        "gold_etf"
    }

    async fn fetch(&self) -> Result<Self::Output, FetchError> {
        let url = format!("{}/q={}", self.base_url, GOLD_ETF_CODE);
        let text = self.fetcher.get_text_gbk(&url, None).await?;
        Self::decode_response(&text)
    }
}

/// Spot metal price from the quote-center realtime endpoint.
///
/// Parameterized by instrument code so both silver (wired by default)
/// and spot gold share one implementation.
pub struct SpotMetalSource {
    fetcher: Arc<HttpFetcher>,
    base_url: String,
    referer: String,
    code: &'static str,
    symbol: &'static str,
    display: &'static str,
    source_name: &'static str,
}

impl SpotMetalSource {
    /// Spot silver (XAG), CNY per gram.
    pub fn silver(
        fetcher: Arc<HttpFetcher>,
        base_url: impl Into<String>,
        referer: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            referer: referer.into(),
            code: SILVER_SPOT_CODE,
            symbol: "XAG",
            display: "白银现价",
            source_name: "silver_spot",
        }
    }

    /// Spot gold (XAU), CNY per gram.
    pub fn gold(
        fetcher: Arc<HttpFetcher>,
        base_url: impl Into<String>,
        referer: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            referer: referer.into(),
            code: GOLD_SPOT_CODE,
            symbol: "XAU",
            display: "黄金现价",
            source_name: "gold_spot",
        }
    }

    fn decode_response(&self, text: &str) -> Result<CanonicalQuote, FetchError> {
        let record = quote_center::parse(text)?;
        Ok(CanonicalQuote {
            symbol: self.symbol.to_string(),
            display_name: self.display.to_string(),
            price: record.price,
            change: record.change,
            change_percent: record.change_percent,
            timestamp_ms: record.timestamp_ms,
        })
    }
}

#[async_trait]
impl QuoteSource for SpotMetalSource {
    type Output = CanonicalQuote;

    fn name(&self) -> &'static str {
        self.source_name
    }

    async fn fetch(&self) -> Result<Self::Output, FetchError> {
        let url = format!(
            "{}/realTime.htm?code={}&isCalc=true",
            self.base_url, self.code
        );
        let text = self
            .fetcher
            .get_text_gbk(&url, Some(&self.referer))
            .await?;
        self.decode_response(&text)
    }
}
