//! Quotewall — Entry Point
//!
//! Initializes configuration, logging, the canonical store and all
//! ingestion paths. Runs until SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Shutdown broadcast channel
//! 4. Shared plumbing: HTTP fetcher, store, FX baseline, metrics
//! 5. Start per-class pollers (equities, gold, silver, crypto pairs)
//! 6. Spawn FX push channel + failover controller
//! 7. Spawn metrics/health server (/live + /ready + /metrics)
//! 8. Wait for SIGINT → graceful shutdown (stop pollers → drain tasks)

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info};

use quotewall::adapters::crypto::CryptoTickerSource;
use quotewall::adapters::equities::EquitySource;
use quotewall::adapters::fx::{FxRestSource, RateBaseline};
use quotewall::adapters::http::HttpFetcher;
use quotewall::adapters::metals::{GoldEtfSource, SpotMetalSource};
use quotewall::cache::TtlCache;
use quotewall::config::{self, AppConfig};
use quotewall::metrics::MetricsRegistry;
use quotewall::poller::Poller;
use quotewall::store::QuoteStore;
use quotewall::stream::{FailoverController, FxStreamChannel};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration from config.toml ──────────────
    let config =
        config::loader::load_config("config.toml").context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.service.log_level)),
        )
        .json()
        .init();

    info!(
        name = %config.service.name,
        version = env!("CARGO_PKG_VERSION"),
        crypto_pairs = config.sources.crypto_pairs.len(),
        "Starting quotewall"
    );

    // ── 3. Shutdown signal channel ──────────────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);

    // ── 4. Shared plumbing ──────────────────────────────────
    let fetcher = Arc::new(
        HttpFetcher::new(config.http.timeout()).context("Failed to build HTTP client")?,
    );
    let store = Arc::new(QuoteStore::new());
    let baseline = Arc::new(RateBaseline::new());
    let metrics = Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);
    let ready = Arc::new(AtomicBool::new(false));

    // ── 5. Per-class pollers ────────────────────────────────
    let pollers = start_pollers(&config, &fetcher, &store);

    // ── 6. FX push channel + failover controller ────────────
    let fx_controller = Arc::new(FailoverController::new(
        Arc::new(TtlCache::new(
            FxRestSource::new(
                Arc::clone(&fetcher),
                config.sources.fx_rest_url.clone(),
                config.sources.fx_target_currency.clone(),
                Arc::clone(&baseline),
            ),
            config.cache.fx(),
        )),
        Arc::clone(&store),
        Arc::clone(&baseline),
        config.polling.fx_fallback(),
        config.failover.debounce(),
    ));

    let (fx_events_tx, fx_events_rx) = mpsc::channel(64);
    let fx_channel = FxStreamChannel::new(
        config.sources.fx_ws_url.clone(),
        config.sources.fx_ws_pair.clone(),
        fx_events_tx,
    );

    let channel_shutdown = shutdown_tx.subscribe();
    let channel_handle = tokio::spawn(async move {
        if let Err(e) = fx_channel.run(channel_shutdown).await {
            error!(error = %e, "FX stream channel task failed");
        }
    });

    let controller_shutdown = shutdown_tx.subscribe();
    let controller_ref = Arc::clone(&fx_controller);
    let controller_handle = tokio::spawn(async move {
        controller_ref.run(fx_events_rx, controller_shutdown).await;
    });

    // ── 7. Metrics observers + health server ────────────────
    tokio::spawn(Arc::clone(&metrics).watch_store(Arc::clone(&store), Arc::clone(&ready)));
    tokio::spawn(
        Arc::clone(&metrics)
            .watch_fx_channel(fx_controller.state(), fx_controller.active_source()),
    );

    let server_shutdown = shutdown_tx.subscribe();
    let server_port = config.service.health_port;
    let server_handle = tokio::spawn(Arc::clone(&metrics).serve(
        server_port,
        Arc::clone(&ready),
        server_shutdown,
    ));

    info!("All tasks spawned — quotewall is running");

    // ── 8. Wait for SIGINT ──────────────────────────────────
    signal::ctrl_c().await.context("Failed to listen for SIGINT")?;
    info!("SIGINT received, initiating graceful shutdown");

    // ── Graceful shutdown ───────────────────────────────────
    let _ = shutdown_tx.send(());
    for poller in &pollers {
        poller.stop();
    }

    let drain = std::time::Duration::from_secs(5);
    let _ = tokio::time::timeout(drain, controller_handle).await;
    let _ = tokio::time::timeout(drain, channel_handle).await;
    let _ = tokio::time::timeout(drain, server_handle).await;

    info!("Shutdown complete");
    Ok(())
}

/// Build source, cache and poller for every polled instrument class
/// and start them all.
fn start_pollers(
    config: &AppConfig,
    fetcher: &Arc<HttpFetcher>,
    store: &Arc<QuoteStore>,
) -> Vec<Arc<Poller>> {
    let mut pollers = Vec::new();

    // Equities: one batched request covering every configured symbol.
    {
        let cache = Arc::new(TtlCache::new(
            EquitySource::new(Arc::clone(fetcher), config.sources.equities_base_url.clone()),
            config.cache.equities(),
        ));
        let store = Arc::clone(store);
        let poller = Arc::new(Poller::new("equities", config.polling.equities()));
        poller.start(move |guard| {
            let cache = Arc::clone(&cache);
            let store = Arc::clone(&store);
            async move {
                let Some(quotes) = cache.get().await else {
                    return;
                };
                if guard.is_cancelled() {
                    return;
                }
                for quote in quotes.into_values() {
                    store.upsert_equity(quote).await;
                }
            }
        });
        pollers.push(poller);
    }

    // Gold via the ETF proxy, rescaled to CNY per gram.
    {
        let cache = Arc::new(TtlCache::new(
            GoldEtfSource::new(Arc::clone(fetcher), config.sources.equities_base_url.clone()),
            config.cache.gold(),
        ));
        let store = Arc::clone(store);
        let poller = Arc::new(Poller::new("gold", config.polling.gold()));
        poller.start(move |guard| {
            let cache = Arc::clone(&cache);
            let store = Arc::clone(&store);
            async move {
                let Some(quote) = cache.get().await else {
                    return;
                };
                if guard.is_cancelled() {
                    return;
                }
                store.set_gold(quote).await;
            }
        });
        pollers.push(poller);
    }

    // Silver from the spot quote-center endpoint.
    {
        let cache = Arc::new(TtlCache::new(
            SpotMetalSource::silver(
                Arc::clone(fetcher),
                config.sources.quote_center_base_url.clone(),
                config.sources.quote_center_referer.clone(),
            ),
            config.cache.silver(),
        ));
        let store = Arc::clone(store);
        let poller = Arc::new(Poller::new("silver", config.polling.silver()));
        poller.start(move |guard| {
            let cache = Arc::clone(&cache);
            let store = Arc::clone(&store);
            async move {
                let Some(quote) = cache.get().await else {
                    return;
                };
                if guard.is_cancelled() {
                    return;
                }
                store.set_silver(quote).await;
            }
        });
        pollers.push(poller);
    }

    // One independent cache and poller per crypto pair.
    for pair in &config.sources.crypto_pairs {
        let source =
            CryptoTickerSource::new(Arc::clone(fetcher), config.sources.crypto_base_url.clone(), pair);
        let cache = Arc::new(TtlCache::new(source, config.cache.crypto()));
        let store = Arc::clone(store);
        let poller = Arc::new(Poller::new(format!("crypto_{pair}"), config.polling.crypto()));
        poller.start(move |guard| {
            let cache = Arc::clone(&cache);
            let store = Arc::clone(&store);
            async move {
                let Some(quote) = cache.get().await else {
                    return;
                };
                if guard.is_cancelled() {
                    return;
                }
                store.upsert_crypto(quote).await;
            }
        });
        pollers.push(poller);
    }

    pollers
}
