//! Prometheus Metrics and Health Endpoints
//!
//! Registers ingestion metrics and serves them together with /live and
//! /ready probes on a single axum listener. Store throughput is counted
//! by subscribing to the store's broadcast feed; the FX channel gauges
//! mirror the failover controller's watch channels.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};
use tokio::sync::{broadcast, watch};
use tracing::{info, instrument, warn};

use crate::store::QuoteStore;
use crate::stream::{ActiveSource, ChannelState};

const CHANNEL_STATES: [ChannelState; 4] = [
    ChannelState::Disconnected,
    ChannelState::Connecting,
    ChannelState::Connected,
    ChannelState::Error,
];

/// Centralized Prometheus metrics for the ingestion service.
///
/// All metrics follow the naming convention `quotewall_*` and carry an
/// instrument-class label where one applies.
pub struct MetricsRegistry {
    registry: Registry,
    /// Store mutations by instrument class.
    pub store_updates: IntCounterVec,
    /// FX push channel state (exactly one label is 1).
    pub fx_channel_state: IntGaugeVec,
    /// Whether streamed rates currently feed the store (1) or REST (0).
    pub fx_streaming_active: IntGauge,
    /// Unix ms of the most recent store mutation.
    pub last_update_ms: IntGauge,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let store_updates = IntCounterVec::new(
            Opts::new("quotewall_store_updates_total", "Total store mutations"),
            &["class"],
        )?;

        let fx_channel_state = IntGaugeVec::new(
            Opts::new(
                "quotewall_fx_channel_state",
                "FX push channel state (1 on the active label)",
            ),
            &["state"],
        )?;

        let fx_streaming_active = IntGauge::new(
            "quotewall_fx_streaming_active",
            "Whether the FX streaming path is active (1=streaming, 0=rest)",
        )?;

        let last_update_ms = IntGauge::new(
            "quotewall_last_update_ms",
            "Unix ms of the most recent store mutation",
        )?;

        registry.register(Box::new(store_updates.clone()))?;
        registry.register(Box::new(fx_channel_state.clone()))?;
        registry.register(Box::new(fx_streaming_active.clone()))?;
        registry.register(Box::new(last_update_ms.clone()))?;

        Ok(Self {
            registry,
            store_updates,
            fx_channel_state,
            fx_streaming_active,
            last_update_ms,
        })
    }

    /// Count store mutations until the store is dropped. Flips `ready`
    /// on the first ingested quote.
    pub async fn watch_store(self: Arc<Self>, store: Arc<QuoteStore>, ready: Arc<AtomicBool>) {
        let mut events = store.subscribe();
        loop {
            match events.recv().await {
                Ok(event) => {
                    ready.store(true, Ordering::Relaxed);
                    self.store_updates
                        .with_label_values(&[event.class().label()])
                        .inc();
                    self.last_update_ms
                        .set(store.last_update_ms().await as i64);
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Metrics observer lagged behind store events");
                }
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    }

    /// Mirror the failover controller's watch channels into gauges.
    pub async fn watch_fx_channel(
        self: Arc<Self>,
        mut state_rx: watch::Receiver<ChannelState>,
        mut active_rx: watch::Receiver<ActiveSource>,
    ) {
        loop {
            let state = *state_rx.borrow_and_update();
            for candidate in CHANNEL_STATES {
                self.fx_channel_state
                    .with_label_values(&[candidate.label()])
                    .set(i64::from(candidate == state));
            }
            let active = *active_rx.borrow_and_update();
            self.fx_streaming_active
                .set(i64::from(active == ActiveSource::Streaming));

            tokio::select! {
                changed = state_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                changed = active_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }
    }

    /// Serve /live, /ready and /metrics until shutdown.
    #[instrument(skip_all, fields(port))]
    pub async fn serve(
        self: Arc<Self>,
        port: u16,
        ready: Arc<AtomicBool>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let registry = self.registry.clone();

        let app = Router::new()
            .route("/live", get(|| async { (StatusCode::OK, "OK") }))
            .route(
                "/ready",
                get(move || {
                    let ready = Arc::clone(&ready);
                    async move {
                        if ready.load(Ordering::Relaxed) {
                            (StatusCode::OK, "READY")
                        } else {
                            (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
                        }
                    }
                }),
            )
            .route(
                "/metrics",
                get(move || {
                    let registry = registry.clone();
                    async move {
                        let encoder = TextEncoder::new();
                        let mut buffer = Vec::new();
                        match encoder.encode(&registry.gather(), &mut buffer) {
                            Ok(()) => (
                                StatusCode::OK,
                                String::from_utf8(buffer).unwrap_or_default(),
                            ),
                            Err(e) => {
                                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
                            }
                        }
                    }
                }),
            );

        let addr = format!("0.0.0.0:{port}");
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(address = %addr, "Metrics and health server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CanonicalQuote;

    #[tokio::test]
    async fn store_events_increment_class_counters() {
        let metrics = Arc::new(MetricsRegistry::new().unwrap());
        let store = Arc::new(QuoteStore::new());
        let ready = Arc::new(AtomicBool::new(false));

        let observer = tokio::spawn(Arc::clone(&metrics).watch_store(
            Arc::clone(&store),
            Arc::clone(&ready),
        ));

        // Let the spawned observer subscribe before the event is broadcast.
        tokio::task::yield_now().await;

        store
            .set_gold(CanonicalQuote {
                symbol: "SH518880".to_string(),
                display_name: "黄金现价".to_string(),
                price: 600.0,
                change: 10.0,
                change_percent: 1.695,
                timestamp_ms: 1,
            })
            .await;

        // Broadcast delivery is async; give the observer a few polls.
        for _ in 0..50 {
            if ready.load(Ordering::Relaxed) {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert!(ready.load(Ordering::Relaxed));
        assert_eq!(
            metrics.store_updates.with_label_values(&["metal"]).get(),
            1
        );
        observer.abort();
    }

    #[tokio::test]
    async fn channel_gauges_track_watch_values() {
        let metrics = Arc::new(MetricsRegistry::new().unwrap());
        let (state_tx, state_rx) = watch::channel(ChannelState::Connected);
        let (active_tx, active_rx) = watch::channel(ActiveSource::Streaming);

        let observer =
            tokio::spawn(Arc::clone(&metrics).watch_fx_channel(state_rx, active_rx));
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert_eq!(
            metrics
                .fx_channel_state
                .with_label_values(&["connected"])
                .get(),
            1
        );
        assert_eq!(metrics.fx_streaming_active.get(), 1);

        state_tx.send_replace(ChannelState::Error);
        active_tx.send_replace(ActiveSource::Rest);
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert_eq!(
            metrics
                .fx_channel_state
                .with_label_values(&["connected"])
                .get(),
            0
        );
        assert_eq!(
            metrics.fx_channel_state.with_label_values(&["error"]).get(),
            1
        );
        assert_eq!(metrics.fx_streaming_active.get(), 0);
        observer.abort();
    }
}
