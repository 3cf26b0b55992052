//! Quote Source Port — One Upstream Endpoint per Implementor
//!
//! Each adapter owns exactly one upstream endpoint and converts its
//! response into the canonical shape for its instrument class. The TTL
//! cache, pollers, and failover controller only ever see this trait,
//! so tests can substitute a mock source for any upstream.

use async_trait::async_trait;

use crate::error::FetchError;

/// A single upstream quote source.
///
/// Multi-symbol sources (equities) produce a symbol-keyed map; single
/// instrument sources produce one record. `fetch` performs exactly one
/// upstream round trip — no internal retries, caching, or scheduling.
#[async_trait]
pub trait QuoteSource: Send + Sync + 'static {
    /// Canonical output shape for this source's instrument class.
    type Output: Clone + Send + Sync + 'static;

    /// Stable source name for logs and metrics.
    fn name(&self) -> &'static str;

    /// Fetch and decode the current upstream state.
    async fn fetch(&self) -> Result<Self::Output, FetchError>;
}
