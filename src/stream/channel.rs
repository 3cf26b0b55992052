//! FX Push Channel — WebSocket Session Management
//!
//! Maintains the WebSocket connection to the FX streaming upstream and
//! translates its lifecycle into [`ChannelEvent`]s for the failover
//! controller. The channel itself keeps reconnecting with a fixed
//! backoff; deciding what to do about the gaps is the controller's job,
//! not ours.

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, instrument, warn};

/// Delay before re-dialing a dropped connection.
const RECONNECT_BACKOFF: std::time::Duration = std::time::Duration::from_secs(5);

/// Lifecycle and data events emitted toward the failover controller.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// A dial attempt has started.
    Connecting,
    /// The upstream acknowledged our subscription.
    Connected,
    /// One absolute rate observation from the stream.
    Rate {
        rate: f64,
        source_timestamp: String,
    },
    /// The session ended. `reason` is present for failures, absent for
    /// a clean upstream close.
    Closed { reason: Option<String> },
}

/// How a single WebSocket session ended, excluding failures.
enum SessionEnd {
    /// Our side is shutting down or the controller hung up.
    Shutdown,
    /// The upstream closed the connection cleanly.
    Remote,
}

/// Subscription request frame.
#[derive(Serialize)]
struct SubscribeFrame<'a> {
    action: &'static str,
    pair: &'a str,
}

/// Every inbound frame shape we care about, lenient on extras.
#[derive(Debug, Deserialize)]
struct StreamFrame {
    /// "subscribed" on the ack frame.
    #[serde(default)]
    event: Option<String>,
    /// Pair the frame refers to.
    #[serde(default)]
    pair: Option<String>,
    /// Absolute rate; the stream never sends deltas.
    #[serde(default)]
    rate: Option<f64>,
    /// Origin-reported timestamp string.
    #[serde(default)]
    timestamp: Option<String>,
}

/// WebSocket channel for the FX streaming upstream.
pub struct FxStreamChannel {
    ws_url: String,
    pair: String,
    events: mpsc::Sender<ChannelEvent>,
}

impl FxStreamChannel {
    pub fn new(
        ws_url: impl Into<String>,
        pair: impl Into<String>,
        events: mpsc::Sender<ChannelEvent>,
    ) -> Self {
        Self {
            ws_url: ws_url.into(),
            pair: pair.into(),
            events,
        }
    }

    async fn emit(&self, event: ChannelEvent) -> bool {
        self.events.send(event).await.is_ok()
    }

    /// Run the connection loop until shutdown or until the controller
    /// side hangs up.
    #[instrument(skip(self, shutdown_rx), fields(pair = %self.pair))]
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        info!(url = %self.ws_url, "FX stream channel starting");

        loop {
            if !self.emit(ChannelEvent::Connecting).await {
                return Ok(());
            }

            let closed = match self.connect_and_stream(&mut shutdown_rx).await {
                Ok(SessionEnd::Shutdown) => {
                    info!("FX stream channel shut down gracefully");
                    return Ok(());
                }
                Ok(SessionEnd::Remote) => {
                    info!("FX stream closed by upstream, reconnecting in 5s");
                    ChannelEvent::Closed { reason: None }
                }
                Err(e) => {
                    warn!(error = %e, "FX stream session failed, reconnecting in 5s");
                    ChannelEvent::Closed {
                        reason: Some(e.to_string()),
                    }
                }
            };
            if !self.emit(closed).await {
                return Ok(());
            }
            tokio::select! {
                _ = shutdown_rx.recv() => return Ok(()),
                _ = tokio::time::sleep(RECONNECT_BACKOFF) => {}
            }
        }
    }

    /// One session: dial, subscribe, stream until error or shutdown.
    async fn connect_and_stream(
        &self,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> Result<SessionEnd> {
        let (ws_stream, _) = connect_async(&self.ws_url)
            .await
            .context("FX WebSocket connection failed")?;

        let (mut write, mut read) = ws_stream.split();

        let subscribe = serde_json::to_string(&SubscribeFrame {
            action: "subscribe",
            pair: &self.pair,
        })
        .context("subscribe frame serialization")?;
        write
            .send(Message::Text(subscribe.into()))
            .await
            .context("subscribe frame send failed")?;

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal in FX stream channel");
                    return Ok(SessionEnd::Shutdown);
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if !self.handle_frame(text.as_ref()).await {
                                return Ok(SessionEnd::Shutdown);
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            // Pong is handled automatically by tungstenite
                            debug!(len = data.len(), "FX stream ping received");
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            return Ok(SessionEnd::Remote);
                        }
                        Some(Err(e)) => {
                            return Err(anyhow::anyhow!("FX WebSocket error: {e}"));
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    /// Translate one text frame. Returns false once the controller side
    /// is gone.
    async fn handle_frame(&self, text: &str) -> bool {
        let frame: StreamFrame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(error = %e, "Unparsable FX stream frame dropped");
                return true;
            }
        };

        if frame.event.as_deref() == Some("subscribed") {
            info!(pair = %self.pair, "FX stream subscription acknowledged");
            return self.emit(ChannelEvent::Connected).await;
        }

        match (frame.pair.as_deref(), frame.rate) {
            (Some(pair), Some(rate)) if pair == self.pair && rate > 0.0 => {
                self.emit(ChannelEvent::Rate {
                    rate,
                    source_timestamp: frame.timestamp.unwrap_or_default(),
                })
                .await
            }
            _ => {
                debug!("FX stream frame without usable rate dropped");
                true
            }
        }
    }
}
