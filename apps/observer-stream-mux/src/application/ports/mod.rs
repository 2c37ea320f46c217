//! Port Interfaces
//!
//! The multiplexer reaches the network exclusively through the
//! [`Connector`] port. A connector hands back a [`TransportLink`]: a pair
//! of bounded channels carrying raw text frames. This keeps the channel
//! manager's connect/retry state machine free of any socket types and
//! directly testable against an in-memory link.
//!
//! Link lifecycle, as observed through the channels:
//! - inbound receiver drains to `None` → the connection is gone
//! - outbound send fails → the connection is gone
//!
//! The production implementation is
//! [`WsConnector`](crate::infrastructure::gateway::transport::WsConnector).

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Errors surfaced by a transport connection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection attempt itself failed.
    #[error("connection failed: {0}")]
    ConnectFailed(String),

    /// An established connection was lost.
    #[error("connection closed")]
    Closed,
}

/// One established full-duplex connection to a channel endpoint.
///
/// Both halves carry complete text frames; framing and keepalive are the
/// connector's concern.
#[derive(Debug)]
pub struct TransportLink {
    /// Frames to deliver to the gateway.
    pub outbound: mpsc::Sender<String>,
    /// Frames received from the gateway.
    pub inbound: mpsc::Receiver<String>,
}

/// Factory for transport connections.
///
/// Exactly one `connect` call is in flight per channel manager at any
/// time; the returned link is exclusively owned by that manager.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a connection to the given endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ConnectFailed`] when the endpoint cannot
    /// be reached or refuses the connection.
    async fn connect(&self, url: &str) -> Result<TransportLink, TransportError>;
}
