//! Channel Domains and Connection Lifecycle
//!
//! A channel is a logical real-time feed for one telemetry domain. The
//! gateway serves one WebSocket endpoint per domain; the multiplexer keeps
//! at most one connection per domain alive and fans its messages out.

use std::fmt;
use std::str::FromStr;

/// A telemetry domain served by the stream gateway.
///
/// Each domain maps to its own WebSocket endpoint (`{base_url}/{domain}`)
/// and is managed by its own channel manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelDomain {
    /// Live metric samples.
    Metrics,
    /// Real-time log tailing.
    Logs,
    /// Platform event notifications.
    Events,
    /// Trace span updates.
    Traces,
    /// Alert notifications.
    Alerts,
}

impl ChannelDomain {
    /// All domains the gateway serves.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Metrics,
            Self::Logs,
            Self::Events,
            Self::Traces,
            Self::Alerts,
        ]
    }

    /// Get the domain name as used in endpoint paths and envelopes.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Metrics => "metrics",
            Self::Logs => "logs",
            Self::Events => "events",
            Self::Traces => "traces",
            Self::Alerts => "alerts",
        }
    }
}

impl fmt::Display for ChannelDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown domain name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stream domain: {0}")]
pub struct UnknownDomain(pub String);

impl FromStr for ChannelDomain {
    type Err = UnknownDomain;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "metrics" => Ok(Self::Metrics),
            "logs" => Ok(Self::Logs),
            "events" => Ok(Self::Events),
            "traces" => Ok(Self::Traces),
            "alerts" => Ok(Self::Alerts),
            other => Err(UnknownDomain(other.to_string())),
        }
    }
}

/// Connection lifecycle state of a channel.
///
/// Transitions:
///
/// ```text
/// Disconnected ──open()──▶ Connecting ──transport open──▶ Connected
///      ▲                       ▲                              │
///      │                       │ retry permitted              │ transport
///      │                       │                              ▼ error/close
///    (new manager)         Reconnecting ◀─────────────────────┘
///                              │ retries exhausted, or close()
///                              ▼
///                            Closed  (terminal; only open() leaves it)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Manager exists but no connection has been requested yet.
    #[default]
    Disconnected,
    /// A connection attempt is in flight for a fresh open.
    Connecting,
    /// Transport is open; the subscribe envelope has been (re)sent.
    Connected,
    /// Transport was lost; an automatic retry is pending or in flight.
    Reconnecting,
    /// Terminal. Reached by `close()` or retry exhaustion; a new `open()`
    /// call is required to leave.
    Closed,
}

impl ConnectionState {
    /// Get the state name for logging and metrics labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Closed => "closed",
        }
    }

    /// Check whether this state is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
