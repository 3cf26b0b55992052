//! FX Failover Controller — Streaming-first with Debounced REST Fallback
//!
//! Consumes [`ChannelEvent`]s from the push channel and decides which
//! path feeds the store. While the channel is healthy, streamed rates
//! win and the REST poller stays stopped. On a drop, fallback is
//! debounced: a short reconnect spares the REST upstream entirely, a
//! longer outage restarts the poller, whose immediate first tick covers
//! the gap.
//!
//! Both paths diff against the shared [`RateBaseline`], so a failover
//! never produces a bogus jump in the change fields.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Sleep;
use tracing::{debug, info, instrument, warn};

use super::channel::ChannelEvent;
use crate::adapters::fx::{fx_quote, RateBaseline};
use crate::cache::TtlCache;
use crate::domain::{change_against, FxQuote};
use crate::poller::Poller;
use crate::ports::QuoteSource;
use crate::store::QuoteStore;

/// Observable lifecycle of the push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ChannelState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

/// Which path currently feeds FX quotes into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveSource {
    Rest,
    Streaming,
}

/// Failover state machine between the push channel and the REST poller.
pub struct FailoverController<S: QuoteSource<Output = FxQuote>> {
    cache: Arc<TtlCache<S>>,
    store: Arc<QuoteStore>,
    baseline: Arc<RateBaseline>,
    rest_poller: Poller,
    debounce: Duration,
    state_tx: watch::Sender<ChannelState>,
    active_tx: watch::Sender<ActiveSource>,
}

impl<S: QuoteSource<Output = FxQuote>> FailoverController<S> {
    pub fn new(
        cache: Arc<TtlCache<S>>,
        store: Arc<QuoteStore>,
        baseline: Arc<RateBaseline>,
        rest_interval: Duration,
        debounce: Duration,
    ) -> Self {
        let (state_tx, _) = watch::channel(ChannelState::Disconnected);
        let (active_tx, _) = watch::channel(ActiveSource::Rest);
        Self {
            cache,
            store,
            baseline,
            rest_poller: Poller::new("fx_rest", rest_interval),
            debounce,
            state_tx,
            active_tx,
        }
    }

    /// Watch the channel lifecycle, for metrics and health reporting.
    pub fn state(&self) -> watch::Receiver<ChannelState> {
        self.state_tx.subscribe()
    }

    /// Watch which path is currently active.
    pub fn active_source(&self) -> watch::Receiver<ActiveSource> {
        self.active_tx.subscribe()
    }

    /// Whether the REST fallback poller is currently scheduled.
    pub fn rest_active(&self) -> bool {
        self.rest_poller.is_running()
    }

    fn set_state(&self, state: ChannelState) {
        self.state_tx.send_replace(state);
    }

    /// Activate the REST path. The poller's immediate first tick doubles
    /// as the one-off gap fetch after a failover.
    fn start_rest(&self) {
        if self.rest_poller.is_running() {
            return;
        }
        self.active_tx.send_replace(ActiveSource::Rest);
        let cache = Arc::clone(&self.cache);
        let store = Arc::clone(&self.store);
        self.rest_poller.start(move |guard| {
            let cache = Arc::clone(&cache);
            let store = Arc::clone(&store);
            async move {
                let Some(quote) = cache.get().await else {
                    return;
                };
                if guard.is_cancelled() {
                    return;
                }
                store.set_fx(quote).await;
            }
        });
    }

    async fn apply_streamed_rate(&self, rate: f64, source_timestamp: String) {
        let (change, change_percent) = change_against(rate, self.baseline.get());
        self.baseline.record(rate);
        self.store
            .set_fx(fx_quote(rate, change, change_percent, source_timestamp))
            .await;
    }

    /// Drive the state machine until shutdown.
    ///
    /// Starts on REST, hands over to streaming on the subscription ack,
    /// and falls back when the channel stays down past the debounce.
    #[instrument(skip_all, fields(source = %self.cache.source_name()))]
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<ChannelEvent>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        self.start_rest();
        let mut debounce: Option<Pin<Box<Sleep>>> = None;

        loop {
            let fallback_armed = debounce.is_some();
            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal in FX failover controller");
                    self.rest_poller.stop();
                    return;
                }

                () = async {
                    if let Some(sleep) = debounce.as_mut() {
                        sleep.await;
                    }
                }, if fallback_armed => {
                    debounce = None;
                    if *self.state_tx.borrow() != ChannelState::Connected {
                        warn!("Push channel still down after debounce, falling back to REST");
                        self.start_rest();
                    }
                }

                event = events.recv() => {
                    let Some(event) = event else {
                        warn!("FX stream channel hung up, staying on REST");
                        self.start_rest();
                        let _ = shutdown_rx.recv().await;
                        self.rest_poller.stop();
                        return;
                    };
                    match event {
                        ChannelEvent::Connecting => {
                            self.set_state(ChannelState::Connecting);
                        }
                        ChannelEvent::Connected => {
                            info!("Push channel live, stopping REST poller");
                            debounce = None;
                            self.rest_poller.stop();
                            self.active_tx.send_replace(ActiveSource::Streaming);
                            self.set_state(ChannelState::Connected);
                        }
                        ChannelEvent::Rate { rate, source_timestamp } => {
                            if *self.state_tx.borrow() == ChannelState::Connected {
                                self.apply_streamed_rate(rate, source_timestamp).await;
                            } else {
                                debug!(rate, "Streamed rate outside connected state dropped");
                            }
                        }
                        ChannelEvent::Closed { reason } => {
                            let state = if reason.is_some() {
                                ChannelState::Error
                            } else {
                                ChannelState::Disconnected
                            };
                            self.set_state(state);
                            if *self.active_tx.borrow() == ActiveSource::Streaming
                                && debounce.is_none()
                            {
                                info!(
                                    debounce_ms = self.debounce.as_millis() as u64,
                                    "Push channel down, arming REST fallback"
                                );
                                debounce = Some(Box::pin(tokio::time::sleep(self.debounce)));
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::error::FetchError;

    /// FX source yielding 7.10, 7.11, 7.12, ... and counting calls.
    struct ScriptedFxSource {
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl QuoteSource for ScriptedFxSource {
        type Output = FxQuote;

        fn name(&self) -> &'static str {
            "fx_rest"
        }

        async fn fetch(&self) -> Result<FxQuote, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let rate = 7.10 + 0.01 * f64::from(call);
            Ok(fx_quote(rate, 0.0, 0.0, String::new()))
        }
    }

    struct Harness {
        controller: Arc<FailoverController<ScriptedFxSource>>,
        events: mpsc::Sender<ChannelEvent>,
        shutdown: broadcast::Sender<()>,
        store: Arc<QuoteStore>,
        fetches: Arc<AtomicU32>,
    }

    fn harness() -> Harness {
        let fetches = Arc::new(AtomicU32::new(0));
        let source = ScriptedFxSource {
            calls: Arc::clone(&fetches),
        };
        // Zero TTL: every poller tick reaches the source.
        let cache = Arc::new(TtlCache::new(source, Duration::ZERO));
        let store = Arc::new(QuoteStore::new());
        let controller = Arc::new(FailoverController::new(
            Arc::clone(&cache),
            Arc::clone(&store),
            Arc::new(RateBaseline::new()),
            Duration::from_secs(3600),
            Duration::from_secs(3),
        ));

        let (events, events_rx) = mpsc::channel(16);
        let (shutdown, shutdown_rx) = broadcast::channel(1);
        tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.run(events_rx, shutdown_rx).await }
        });

        Harness {
            controller,
            events,
            shutdown,
            store,
            fetches,
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn starts_on_rest_with_immediate_fetch() {
        let h = harness();
        settle().await;

        assert_eq!(h.fetches.load(Ordering::SeqCst), 1);
        assert!(h.controller.rest_active());
        assert_eq!(*h.controller.active_source().borrow(), ActiveSource::Rest);
        let fx = h.store.fx().await.unwrap();
        assert!((fx.rate - 7.10).abs() < 1e-9);

        let _ = h.shutdown.send(());
    }

    #[tokio::test(start_paused = true)]
    async fn connected_stops_rest_and_streams_rates() {
        let h = harness();
        settle().await;

        h.events.send(ChannelEvent::Connecting).await.unwrap();
        h.events.send(ChannelEvent::Connected).await.unwrap();
        settle().await;

        assert!(!h.controller.rest_active());
        assert_eq!(
            *h.controller.active_source().borrow(),
            ActiveSource::Streaming
        );
        assert_eq!(*h.controller.state().borrow(), ChannelState::Connected);

        h.events
            .send(ChannelEvent::Rate {
                rate: 7.20,
                source_timestamp: "t1".to_string(),
            })
            .await
            .unwrap();
        h.events
            .send(ChannelEvent::Rate {
                rate: 7.30,
                source_timestamp: "t2".to_string(),
            })
            .await
            .unwrap();
        settle().await;

        // Second streamed rate diffs against the first.
        let fx = h.store.fx().await.unwrap();
        assert!((fx.rate - 7.30).abs() < 1e-9);
        assert!((fx.change - 0.10).abs() < 1e-9);
        assert_eq!(h.fetches.load(Ordering::SeqCst), 1);

        let _ = h.shutdown.send(());
    }

    #[tokio::test(start_paused = true)]
    async fn outage_past_debounce_falls_back_to_rest() {
        let h = harness();
        settle().await;
        h.events.send(ChannelEvent::Connected).await.unwrap();
        settle().await;
        assert_eq!(h.fetches.load(Ordering::SeqCst), 1);

        h.events
            .send(ChannelEvent::Closed {
                reason: Some("io error".to_string()),
            })
            .await
            .unwrap();
        settle().await;

        // Inside the debounce window nothing happens yet.
        assert_eq!(*h.controller.state().borrow(), ChannelState::Error);
        assert!(!h.controller.rest_active());
        assert_eq!(h.fetches.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(3)).await;
        settle().await;

        // Exactly one gap fetch from the restarted poller.
        assert!(h.controller.rest_active());
        assert_eq!(*h.controller.active_source().borrow(), ActiveSource::Rest);
        assert_eq!(h.fetches.load(Ordering::SeqCst), 2);

        let _ = h.shutdown.send(());
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_within_debounce_spares_rest() {
        let h = harness();
        settle().await;
        h.events.send(ChannelEvent::Connected).await.unwrap();
        settle().await;

        h.events
            .send(ChannelEvent::Closed { reason: None })
            .await
            .unwrap();
        settle().await;
        assert_eq!(*h.controller.state().borrow(), ChannelState::Disconnected);

        tokio::time::advance(Duration::from_secs(1)).await;
        h.events.send(ChannelEvent::Connecting).await.unwrap();
        h.events.send(ChannelEvent::Connected).await.unwrap();
        settle().await;

        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;

        // No REST traffic beyond the startup fetch.
        assert!(!h.controller.rest_active());
        assert_eq!(
            *h.controller.active_source().borrow(),
            ActiveSource::Streaming
        );
        assert_eq!(h.fetches.load(Ordering::SeqCst), 1);

        let _ = h.shutdown.send(());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_rest_poller() {
        let h = harness();
        settle().await;
        assert!(h.controller.rest_active());

        let _ = h.shutdown.send(());
        settle().await;
        assert!(!h.controller.rest_active());
    }
}
