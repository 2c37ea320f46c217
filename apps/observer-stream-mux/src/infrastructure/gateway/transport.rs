//! WebSocket Transport Connector
//!
//! Production implementation of the [`Connector`] port on top of
//! tokio-tungstenite. Each successful connect spawns a pump task that owns
//! the socket for its whole life:
//!
//! - outbound frames from the link are written as text messages
//! - inbound text messages are forwarded into the link
//! - protocol pings are answered immediately
//! - a heartbeat ping is sent on an interval; a missing pong within the
//!   timeout tears the connection down
//!
//! The pump exits on socket close, socket error, heartbeat timeout, or
//! when the channel manager drops its side of the link. Exit always drops
//! the inbound sender, which is how the manager observes connection loss.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;

use crate::application::ports::{Connector, TransportError, TransportLink};

/// Frames buffered toward the gateway before the sender backpressures.
const OUTBOUND_BUFFER: usize = 64;

/// Frames buffered toward the channel manager.
const INBOUND_BUFFER: usize = 256;

/// Keepalive configuration for a WebSocket connection.
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Interval between heartbeat pings.
    pub interval: Duration,
    /// Silence tolerated after a ping before the connection is declared dead.
    pub timeout: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(20),
            timeout: Duration::from_secs(40),
        }
    }
}

/// WebSocket connector for gateway channel endpoints.
#[derive(Debug, Clone, Default)]
pub struct WsConnector {
    heartbeat: HeartbeatConfig,
}

impl WsConnector {
    /// Create a connector with the given keepalive configuration.
    #[must_use]
    pub const fn new(heartbeat: HeartbeatConfig) -> Self {
        Self { heartbeat }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<TransportLink, TransportError> {
        tracing::debug!(url, "opening WebSocket connection");

        let (socket, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

        let (outbound_tx, outbound_rx) = mpsc::channel::<String>(OUTBOUND_BUFFER);
        let (inbound_tx, inbound_rx) = mpsc::channel::<String>(INBOUND_BUFFER);

        tokio::spawn(pump(socket, outbound_rx, inbound_tx, self.heartbeat.clone()));

        Ok(TransportLink {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}

/// Why the pump stopped; logged, then the link is dropped.
#[derive(Debug)]
enum PumpExit {
    ServerClosed,
    SocketError(tokio_tungstenite::tungstenite::Error),
    HeartbeatTimeout,
    LinkDropped,
}

async fn pump<S>(
    socket: S,
    mut outbound_rx: mpsc::Receiver<String>,
    inbound_tx: mpsc::Sender<String>,
    heartbeat: HeartbeatConfig,
) where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + Sink<Message, Error = tokio_tungstenite::tungstenite::Error>
        + Unpin,
{
    let (mut write, mut read) = socket.split();
    let mut ping_timer = tokio::time::interval(heartbeat.interval);
    ping_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Swallow the immediate first tick so the first ping waits a full interval.
    ping_timer.tick().await;

    let mut last_pong = Instant::now();
    let mut awaiting_pong = false;

    let exit = loop {
        tokio::select! {
            frame = outbound_rx.recv() => {
                match frame {
                    Some(text) => {
                        if let Err(e) = write.send(Message::Text(text.into())).await {
                            break PumpExit::SocketError(e);
                        }
                    }
                    None => break PumpExit::LinkDropped,
                }
            }
            _ = ping_timer.tick() => {
                if awaiting_pong && last_pong.elapsed() > heartbeat.timeout {
                    break PumpExit::HeartbeatTimeout;
                }
                if let Err(e) = write.send(Message::Ping(vec![].into())).await {
                    break PumpExit::SocketError(e);
                }
                awaiting_pong = true;
            }
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        // Any traffic proves the connection is alive.
                        last_pong = Instant::now();
                        awaiting_pong = false;
                        if inbound_tx.send(text.to_string()).await.is_err() {
                            break PumpExit::LinkDropped;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        last_pong = Instant::now();
                        awaiting_pong = false;
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if let Err(e) = write.send(Message::Pong(payload)).await {
                            break PumpExit::SocketError(e);
                        }
                    }
                    Some(Ok(Message::Close(_))) => break PumpExit::ServerClosed,
                    Some(Ok(_)) => {
                        // Binary and raw frames are not part of the protocol.
                    }
                    Some(Err(e)) => break PumpExit::SocketError(e),
                    None => break PumpExit::ServerClosed,
                }
            }
        }
    };

    match &exit {
        PumpExit::ServerClosed => tracing::debug!("WebSocket closed by server"),
        PumpExit::SocketError(e) => tracing::warn!(error = %e, "WebSocket error"),
        PumpExit::HeartbeatTimeout => tracing::warn!("WebSocket heartbeat timeout"),
        PumpExit::LinkDropped => tracing::debug!("transport link dropped by owner"),
    }

    if matches!(exit, PumpExit::LinkDropped) {
        let _ = write.send(Message::Close(None)).await;
    }
    // inbound_tx drops here; the channel manager sees end-of-stream.
}
