//! Equities & Indices Source — Batched Delimited-ticker Endpoint
//!
//! One request fetches every configured symbol: CN indices and shares
//! plus US indices and shares, all served by the same delimited-ticker
//! upstream. The response is GBK-encoded. Upstream symbol codes are
//! mapped to internal identifiers through a static table; response keys
//! with no table entry are silently ignored.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use super::http::HttpFetcher;
use crate::domain::{now_ms, EquityQuote};
use crate::error::FetchError;
use crate::parsers::delimited;
use crate::ports::QuoteSource;

/// Static mapping from upstream code to internal symbol.
struct EquitySymbol {
    /// Code in the upstream query and response key.
    upstream: &'static str,
    /// Internal symbol identifier.
    internal: &'static str,
    /// Fallback display name when the payload name field is empty.
    display: &'static str,
    /// Source-specific minimum field count for this record.
    min_fields: usize,
}

/// CN records carry turnover rate at field 38; US records are shorter
/// and stop being useful below 8 fields.
const SYMBOLS: &[EquitySymbol] = &[
    EquitySymbol { upstream: "sh000001", internal: "sh000001", display: "上证指数", min_fields: delimited::EQUITY_MIN_FIELDS },
    EquitySymbol { upstream: "sz399001", internal: "sz399001", display: "深证成指", min_fields: delimited::EQUITY_MIN_FIELDS },
    EquitySymbol { upstream: "sz399006", internal: "sz399006", display: "创业板指", min_fields: delimited::EQUITY_MIN_FIELDS },
    EquitySymbol { upstream: "sh601318", internal: "sh601318", display: "中国平安", min_fields: delimited::EQUITY_MIN_FIELDS },
    EquitySymbol { upstream: "sh512000", internal: "sh512000", display: "券商ETF", min_fields: delimited::EQUITY_MIN_FIELDS },
    EquitySymbol { upstream: "usDJI", internal: "us_dji", display: "道琼斯工业平均指数", min_fields: 8 },
    EquitySymbol { upstream: "usIXIC", internal: "us_ixic", display: "纳斯达克综合指数", min_fields: 8 },
    EquitySymbol { upstream: "usINX", internal: "us_spx", display: "标普500指数", min_fields: 8 },
    EquitySymbol { upstream: "usNVDA", internal: "us_nvda", display: "英伟达", min_fields: 8 },
    EquitySymbol { upstream: "usGOOGL", internal: "us_googl", display: "谷歌-A", min_fields: 8 },
    EquitySymbol { upstream: "usAAPL", internal: "us_aapl", display: "苹果", min_fields: 8 },
    EquitySymbol { upstream: "usTSLA", internal: "us_tsla", display: "特斯拉", min_fields: 8 },
];

/// Batched equities/indices source.
pub struct EquitySource {
    fetcher: std::sync::Arc<HttpFetcher>,
    base_url: String,
}

impl EquitySource {
    pub fn new(fetcher: std::sync::Arc<HttpFetcher>, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }

    fn query_url(&self) -> String {
        let codes: Vec<&str> = SYMBOLS.iter().map(|s| s.upstream).collect();
        format!("{}/q={}", self.base_url, codes.join(","))
    }

    /// Map a decoded response body into canonical equity quotes.
    ///
    /// Records that fail parsing or validation are dropped individually;
    /// one bad symbol never poisons the batch.
    fn decode_response(text: &str) -> HashMap<String, EquityQuote> {
        let payloads = delimited::parse_response(text);
        let observed_at = now_ms();
        let mut quotes = HashMap::new();

        for symbol in SYMBOLS {
            let Some(payload) = payloads.get(symbol.upstream) else {
                continue;
            };
            match delimited::parse_payload(payload, symbol.min_fields) {
                Ok(fields) => {
                    let display_name = if fields.name.is_empty() {
                        symbol.display.to_string()
                    } else {
                        fields.name.clone()
                    };
                    quotes.insert(
                        symbol.internal.to_string(),
                        EquityQuote {
                            symbol: symbol.internal.to_string(),
                            display_name,
                            price: fields.price,
                            change: fields.change,
                            change_percent: fields.change_percent,
                            open: fields.open,
                            prev_close: fields.prev_close,
                            turnover_rate: fields.turnover_rate,
                            timestamp_ms: observed_at,
                        },
                    );
                }
                Err(err) => {
                    debug!(symbol = symbol.internal, error = %err, "Dropping equity record");
                }
            }
        }

        quotes
    }
}

#[async_trait]
impl QuoteSource for EquitySource {
    type Output = HashMap<String, EquityQuote>;

    fn name(&self) -> &'static str {
        "equities"
    }

    async fn fetch(&self) -> Result<Self::Output, FetchError> {
        let text = self.fetcher.get_text_gbk(&self.query_url(), None).await?;
        Ok(Self::decode_response(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cn_payload(name: &str, price: &str, prev: &str, open: &str, turnover: &str) -> String {
        let mut parts = vec!["1".to_string(); 39];
        parts[1] = name.to_string();
        parts[3] = price.to_string();
        parts[4] = prev.to_string();
        parts[5] = open.to_string();
        parts[38] = turnover.to_string();
        parts.join("~")
    }

    #[test]
    fn decodes_known_symbols_and_ignores_unknown() {
        let text = format!(
            "v_sh000001=\"{}\";\nv_usDJI=\"200~道琼斯~.DJI~38001.2~37950.0~37960.1~5~6\";\nv_hk00700=\"1~腾讯~700~300~295~296~1~2\";",
            cn_payload("上证指数", "3245.67", "3200.00", "3210.00", "1.23"),
        );
        let quotes = EquitySource::decode_response(&text);

        assert_eq!(quotes.len(), 2);
        let sh = &quotes["sh000001"];
        assert_eq!(sh.display_name, "上证指数");
        assert!((sh.price - 3245.67).abs() < 1e-9);
        assert!((sh.change - 45.67).abs() < 1e-9);
        assert!((sh.change_percent - 1.427_187_5).abs() < 1e-6);
        assert!((sh.turnover_rate - 1.23).abs() < 1e-9);

        let dji = &quotes["us_dji"];
        assert!((dji.price - 38001.2).abs() < 1e-9);
        assert_eq!(dji.turnover_rate, 0.0);

        assert!(!quotes.contains_key("hk00700"));
    }

    #[test]
    fn bad_record_dropped_without_poisoning_batch() {
        let text = format!(
            "v_sh000001=\"{}\";\nv_usDJI=\"200~道琼斯~.DJI~38001.2~0~37960.1~5~6\";",
            cn_payload("上证指数", "3245.67", "3200.00", "3210.00", "1.23"),
        );
        let quotes = EquitySource::decode_response(&text);
        assert_eq!(quotes.len(), 1);
        assert!(quotes.contains_key("sh000001"));
    }

    #[test]
    fn short_cn_record_dropped() {
        let text = "v_sh000001=\"1~上证指数~000001~10~9~9.5\";";
        assert!(EquitySource::decode_response(text).is_empty());
    }
}
