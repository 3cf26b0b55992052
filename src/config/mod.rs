//! Configuration Module — TOML-based Service Configuration
//!
//! Loads and validates configuration from `config.toml`. Upstream URLs,
//! poll cadences, cache windows and the failover debounce are all
//! externalized here — nothing is hardcoded in the ingestion layer.

pub mod loader;

use std::time::Duration;

use serde::Deserialize;

/// Top-level service configuration.
///
/// Loaded from `config.toml` at startup and validated before any
/// poller starts. Every field carries a default, so an empty file is a
/// valid configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Service identity and observability.
    #[serde(default)]
    pub service: ServiceConfig,
    /// Outbound HTTP behaviour.
    #[serde(default)]
    pub http: HttpConfig,
    /// Upstream endpoints per source.
    #[serde(default)]
    pub sources: SourcesConfig,
    /// Poll cadence per instrument class.
    #[serde(default)]
    pub polling: PollingConfig,
    /// Cache freshness window per instrument class.
    #[serde(default)]
    pub cache: CacheConfig,
    /// FX streaming failover behaviour.
    #[serde(default)]
    pub failover: FailoverConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Human-readable service name.
    #[serde(default = "default_service_name")]
    pub name: String,
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Health and metrics endpoint port.
    #[serde(default = "default_health_port")]
    pub health_port: u16,
}

/// Outbound HTTP configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

/// Upstream endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    /// Equity quote endpoint base (delimited script payload, GBK).
    #[serde(default = "default_equities_base_url")]
    pub equities_base_url: String,
    /// Spot metal quote-center endpoint base (GBK, referer-gated).
    #[serde(default = "default_quote_center_base_url")]
    pub quote_center_base_url: String,
    /// Referer header the quote-center endpoint demands.
    #[serde(default = "default_quote_center_referer")]
    pub quote_center_referer: String,
    /// Crypto ticker endpoint base (JSON).
    #[serde(default = "default_crypto_base_url")]
    pub crypto_base_url: String,
    /// Crypto pairs to poll, each with its own cache and poller.
    #[serde(default = "default_crypto_pairs")]
    pub crypto_pairs: Vec<String>,
    /// FX rate table REST endpoint.
    #[serde(default = "default_fx_rest_url")]
    pub fx_rest_url: String,
    /// Currency code to extract from the rate table.
    #[serde(default = "default_fx_target_currency")]
    pub fx_target_currency: String,
    /// FX streaming WebSocket endpoint.
    #[serde(default = "default_fx_ws_url")]
    pub fx_ws_url: String,
    /// Pair identifier used on the streaming subscription.
    #[serde(default = "default_fx_ws_pair")]
    pub fx_ws_pair: String,
}

/// Poll cadence configuration, all in milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_equities_poll_ms")]
    pub equities_ms: u64,
    #[serde(default = "default_gold_poll_ms")]
    pub gold_ms: u64,
    #[serde(default = "default_silver_poll_ms")]
    pub silver_ms: u64,
    #[serde(default = "default_crypto_poll_ms")]
    pub crypto_ms: u64,
    /// REST fallback cadence while the FX stream is down.
    #[serde(default = "default_fx_fallback_ms")]
    pub fx_fallback_ms: u64,
}

/// Cache freshness windows, all in milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_equities_ttl_ms")]
    pub equities_ttl_ms: u64,
    #[serde(default = "default_gold_ttl_ms")]
    pub gold_ttl_ms: u64,
    #[serde(default = "default_silver_ttl_ms")]
    pub silver_ttl_ms: u64,
    #[serde(default = "default_crypto_ttl_ms")]
    pub crypto_ttl_ms: u64,
    #[serde(default = "default_fx_ttl_ms")]
    pub fx_ttl_ms: u64,
}

/// FX failover configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FailoverConfig {
    /// How long the stream must stay down before REST takes over.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl PollingConfig {
    pub fn equities(&self) -> Duration {
        Duration::from_millis(self.equities_ms)
    }

    pub fn gold(&self) -> Duration {
        Duration::from_millis(self.gold_ms)
    }

    pub fn silver(&self) -> Duration {
        Duration::from_millis(self.silver_ms)
    }

    pub fn crypto(&self) -> Duration {
        Duration::from_millis(self.crypto_ms)
    }

    pub fn fx_fallback(&self) -> Duration {
        Duration::from_millis(self.fx_fallback_ms)
    }
}

impl CacheConfig {
    pub fn equities(&self) -> Duration {
        Duration::from_millis(self.equities_ttl_ms)
    }

    pub fn gold(&self) -> Duration {
        Duration::from_millis(self.gold_ttl_ms)
    }

    pub fn silver(&self) -> Duration {
        Duration::from_millis(self.silver_ttl_ms)
    }

    pub fn crypto(&self) -> Duration {
        Duration::from_millis(self.crypto_ttl_ms)
    }

    pub fn fx(&self) -> Duration {
        Duration::from_millis(self.fx_ttl_ms)
    }
}

impl FailoverConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            health_port: default_health_port(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            equities_base_url: default_equities_base_url(),
            quote_center_base_url: default_quote_center_base_url(),
            quote_center_referer: default_quote_center_referer(),
            crypto_base_url: default_crypto_base_url(),
            crypto_pairs: default_crypto_pairs(),
            fx_rest_url: default_fx_rest_url(),
            fx_target_currency: default_fx_target_currency(),
            fx_ws_url: default_fx_ws_url(),
            fx_ws_pair: default_fx_ws_pair(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            equities_ms: default_equities_poll_ms(),
            gold_ms: default_gold_poll_ms(),
            silver_ms: default_silver_poll_ms(),
            crypto_ms: default_crypto_poll_ms(),
            fx_fallback_ms: default_fx_fallback_ms(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            equities_ttl_ms: default_equities_ttl_ms(),
            gold_ttl_ms: default_gold_ttl_ms(),
            silver_ttl_ms: default_silver_ttl_ms(),
            crypto_ttl_ms: default_crypto_ttl_ms(),
            fx_ttl_ms: default_fx_ttl_ms(),
        }
    }
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

// Default value functions for serde

fn default_service_name() -> String {
    "quotewall".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_health_port() -> u16 {
    8080
}

fn default_timeout() -> u64 {
    10
}

fn default_equities_base_url() -> String {
    "http://qt.gtimg.cn".to_string()
}

fn default_quote_center_base_url() -> String {
    "https://api.jijinhao.com/sQuoteCenter".to_string()
}

fn default_quote_center_referer() -> String {
    "https://www.quheqihuo.com/".to_string()
}

fn default_crypto_base_url() -> String {
    "https://data.gateapi.io/api2/1".to_string()
}

fn default_crypto_pairs() -> Vec<String> {
    vec!["btc_usdt".to_string(), "eth_usdt".to_string()]
}

fn default_fx_rest_url() -> String {
    "https://open.er-api.com/v6/latest/USD".to_string()
}

fn default_fx_target_currency() -> String {
    "CNH".to_string()
}

fn default_fx_ws_url() -> String {
    "wss://stream.fxrates.io/v1/ws".to_string()
}

fn default_fx_ws_pair() -> String {
    "USDCNH".to_string()
}

fn default_equities_poll_ms() -> u64 {
    3_000
}

fn default_gold_poll_ms() -> u64 {
    5_000
}

fn default_silver_poll_ms() -> u64 {
    10_000
}

fn default_crypto_poll_ms() -> u64 {
    5_000
}

fn default_fx_fallback_ms() -> u64 {
    3_600_000
}

fn default_equities_ttl_ms() -> u64 {
    2_000
}

fn default_gold_ttl_ms() -> u64 {
    10_000
}

fn default_silver_ttl_ms() -> u64 {
    10_000
}

fn default_crypto_ttl_ms() -> u64 {
    5_000
}

fn default_fx_ttl_ms() -> u64 {
    500
}

fn default_debounce_ms() -> u64 {
    3_000
}
