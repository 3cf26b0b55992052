//! TTL Cache — Freshness Window plus Stale-fallback
//!
//! Wraps exactly one [`QuoteSource`]. Within the freshness window,
//! `get` serves the cached value without touching the upstream; past
//! it, a fresh fetch replaces the entry. A failed fetch returns the
//! last good value instead of the error, so partial upstream outages
//! stay invisible downstream as long as one fetch ever succeeded.
//!
//! `None` is the explicit "never yet observed" sentinel — there is no
//! fabricated placeholder price to confuse with live data.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::ports::QuoteSource;

/// One cached fetch result. Owned exclusively by its cache; mutated
/// only by a successful fetch.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub fetched_at: Instant,
}

/// Freshness-window cache over a single source.
pub struct TtlCache<S: QuoteSource> {
    source: S,
    ttl: Duration,
    entry: Mutex<Option<CacheEntry<S::Output>>>,
}

impl<S: QuoteSource> TtlCache<S> {
    pub fn new(source: S, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// The wrapped source's name, for logs and metrics.
    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Current value: cached while fresh, fetched when stale, last good
    /// value on fetch failure. `None` only before the first success.
    ///
    /// The entry lock is held across the fetch, so concurrent callers
    /// never race duplicate upstream requests inside one window.
    pub async fn get(&self) -> Option<S::Output> {
        let mut entry = self.entry.lock().await;

        if let Some(cached) = entry.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                return Some(cached.value.clone());
            }
        }

        match self.source.fetch().await {
            Ok(value) => {
                *entry = Some(CacheEntry {
                    value: value.clone(),
                    fetched_at: Instant::now(),
                });
                Some(value)
            }
            Err(err) => match entry.as_ref() {
                Some(stale) => {
                    warn!(
                        source = self.source.name(),
                        error = %err,
                        stale_for_ms = stale.fetched_at.elapsed().as_millis() as u64,
                        "Fetch failed, serving stale value"
                    );
                    Some(stale.value.clone())
                }
                None => {
                    debug!(
                        source = self.source.name(),
                        error = %err,
                        "Fetch failed with nothing cached yet"
                    );
                    None
                }
            },
        }
    }
}
