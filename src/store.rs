//! Canonical Store — Latest-known Records per Symbol
//!
//! The single mutable aggregate the rendering layer reads, and the only
//! resource shared across components. Update operations are total: they
//! never fail, last writer wins, and every mutation is announced on a
//! broadcast channel so consumers can re-render without polling.
//!
//! Entries are never deleted — a missing symbol means "never yet
//! observed", not "known unavailable".

use std::collections::HashMap;

use tokio::sync::{broadcast, RwLock};

use crate::domain::{now_ms, CanonicalQuote, CryptoQuote, EquityQuote, FxQuote, InstrumentClass};

/// Announcement of a single store mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Equity(String),
    Crypto(String),
    Gold,
    Silver,
    Fx,
}

impl StoreEvent {
    /// Instrument class of the mutated entry.
    pub const fn class(&self) -> InstrumentClass {
        match self {
            Self::Equity(_) => InstrumentClass::Equity,
            Self::Crypto(_) => InstrumentClass::Crypto,
            Self::Gold | Self::Silver => InstrumentClass::Metal,
            Self::Fx => InstrumentClass::Fx,
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    equities: HashMap<String, EquityQuote>,
    cryptos: HashMap<String, CryptoQuote>,
    gold: Option<CanonicalQuote>,
    silver: Option<CanonicalQuote>,
    fx: Option<FxQuote>,
    last_update_ms: u64,
}

/// Latest-value aggregate of all ingested quotes.
pub struct QuoteStore {
    state: RwLock<StoreState>,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for QuoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl QuoteStore {
    /// Create an empty store.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            state: RwLock::new(StoreState::default()),
            events,
        }
    }

    /// Observe every subsequent mutation.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn announce(&self, event: StoreEvent) {
        // No receivers is fine; ingestion never depends on consumers.
        let _ = self.events.send(event);
    }

    // ── Updates (total, last-writer-wins) ───────────────────

    pub async fn upsert_equity(&self, quote: EquityQuote) {
        let symbol = quote.symbol.clone();
        {
            let mut state = self.state.write().await;
            state.equities.insert(symbol.clone(), quote);
            state.last_update_ms = now_ms();
        }
        self.announce(StoreEvent::Equity(symbol));
    }

    pub async fn upsert_crypto(&self, quote: CryptoQuote) {
        let symbol = quote.symbol.clone();
        {
            let mut state = self.state.write().await;
            state.cryptos.insert(symbol.clone(), quote);
            state.last_update_ms = now_ms();
        }
        self.announce(StoreEvent::Crypto(symbol));
    }

    pub async fn set_gold(&self, quote: CanonicalQuote) {
        {
            let mut state = self.state.write().await;
            state.gold = Some(quote);
            state.last_update_ms = now_ms();
        }
        self.announce(StoreEvent::Gold);
    }

    pub async fn set_silver(&self, quote: CanonicalQuote) {
        {
            let mut state = self.state.write().await;
            state.silver = Some(quote);
            state.last_update_ms = now_ms();
        }
        self.announce(StoreEvent::Silver);
    }

    pub async fn set_fx(&self, quote: FxQuote) {
        {
            let mut state = self.state.write().await;
            state.fx = Some(quote);
            state.last_update_ms = now_ms();
        }
        self.announce(StoreEvent::Fx);
    }

    // ── Read accessors ──────────────────────────────────────

    pub async fn equity(&self, symbol: &str) -> Option<EquityQuote> {
        self.state.read().await.equities.get(symbol).cloned()
    }

    pub async fn equities(&self) -> HashMap<String, EquityQuote> {
        self.state.read().await.equities.clone()
    }

    pub async fn crypto(&self, symbol: &str) -> Option<CryptoQuote> {
        self.state.read().await.cryptos.get(symbol).cloned()
    }

    pub async fn cryptos(&self) -> HashMap<String, CryptoQuote> {
        self.state.read().await.cryptos.clone()
    }

    pub async fn gold(&self) -> Option<CanonicalQuote> {
        self.state.read().await.gold.clone()
    }

    pub async fn silver(&self) -> Option<CanonicalQuote> {
        self.state.read().await.silver.clone()
    }

    pub async fn fx(&self) -> Option<FxQuote> {
        self.state.read().await.fx.clone()
    }

    /// Local time of the most recent mutation (Unix ms); zero when the
    /// store has never been written.
    pub async fn last_update_ms(&self) -> u64 {
        self.state.read().await.last_update_ms
    }
}
