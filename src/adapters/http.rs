//! Shared HTTP Client — Headers and Encoding the Upstreams Require
//!
//! Wraps reqwest with the request shape the quote upstreams insist on:
//! a browser-like user agent everywhere, a source-specific referer where
//! demanded, and GBK decoding for the two legacy-encoded regional
//! sources. Naively decoding those as UTF-8 corrupts every instrument
//! name (prices stay ASCII-safe, which makes the bug easy to miss).
//!
//! No retry logic lives here: a failed fetch is absorbed by the TTL
//! cache's stale-fallback and retried naturally on the next poll tick.

use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use crate::error::FetchError;

/// Desktop-browser user agent; several upstreams reject obvious bots.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Decode a GBK body, substituting replacement characters for invalid
/// sequences. Prices and symbols are ASCII and survive either way; the
/// instrument names do not.
pub fn decode_gbk(body: &[u8]) -> String {
    let (decoded, _, had_errors) = encoding_rs::GBK.decode(body);
    if had_errors {
        debug!("GBK decode produced replacement characters");
    }
    decoded.into_owned()
}

/// Shared HTTP fetcher for all source adapters.
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    /// Build a client with the browser user agent and a request timeout.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(timeout)
            .pool_max_idle_per_host(5)
            .build()?;
        Ok(Self { http })
    }

    async fn get_bytes(&self, url: &str, referer: Option<&str>) -> Result<Vec<u8>, FetchError> {
        let mut request = self.http.get(url).header("Accept", "*/*");
        if let Some(referer) = referer {
            request = request.header("Referer", referer);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.bytes().await?;
        debug!(url, bytes = body.len(), "Upstream response received");
        Ok(body.to_vec())
    }

    /// GET a UTF-8 (or ASCII) text body.
    pub async fn get_text(&self, url: &str, referer: Option<&str>) -> Result<String, FetchError> {
        let body = self.get_bytes(url, referer).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// GET a GBK-encoded text body and decode it explicitly.
    pub async fn get_text_gbk(
        &self,
        url: &str,
        referer: Option<&str>,
    ) -> Result<String, FetchError> {
        let body = self.get_bytes(url, referer).await?;
        Ok(decode_gbk(&body))
    }
}
