#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::default_trait_access
    )
)]

//! Observer Stream Mux - Telemetry Stream Multiplexer
//!
//! Client-side multiplexer for the Observer-Eye stream gateway. Maintains
//! a single resilient WebSocket connection per telemetry domain (metrics,
//! logs, events, traces, alerts) and fans decoded messages out to any
//! number of in-process consumers.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Envelope, filter, and lifecycle types
//!   - `message`: The `{type, data, timestamp}` envelope and payloads
//!   - `filter`: Subscription filters and control envelopes
//!   - `channel`: Channel domains and connection states
//!
//! - **Application**: Port definitions
//!   - `ports`: The `Connector` transport port
//!
//! - **Infrastructure**: Adapters
//!   - `gateway`: Channel manager, codec, backoff, WebSocket transport
//!   - `registry`: Per-domain channel lifecycle
//!   - `config`: Environment-driven settings
//!   - `telemetry` / `metrics`: Tracing setup and instrumentation
//!
//! # Data Flow
//!
//! ```text
//! gateway /metrics ──▶ ChannelManager ──┐
//! gateway /logs    ──▶ ChannelManager ──┼──▶ broadcast ──▶ Consumer 1
//! gateway /alerts  ──▶ ChannelManager ──┘                 Consumer N
//!                          ▲
//!                    StreamRegistry (one manager per domain)
//! ```
//!
//! Each manager reconnects on its own with exponential backoff, replays
//! its subscription filter on every successful connect, and closes for
//! good once the retry budget is spent — consumers observe that as a
//! completed stream plus a terminal `Closed` state.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core telemetry streaming types.
pub mod domain;

/// Application layer - Port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::channel::{ChannelDomain, ConnectionState, UnknownDomain};
pub use domain::filter::{ControlAction, SubscriptionFilter};
pub use domain::message::{
    AlertPayload, AlertSeverity, EventPayload, LogPayload, MetricPayload, StreamKind,
    StreamMessage, StreamPayload, TracePayload,
};

// Ports
pub use application::ports::{Connector, TransportError, TransportLink};

// Gateway adapters
pub use infrastructure::gateway::{
    BackoffConfig, BackoffPolicy, ChannelError, ChannelManager, ChannelSettings, CodecError,
    EnvelopeCodec, HeartbeatConfig, WsConnector,
};

// Registry
pub use infrastructure::registry::{RegistryStats, StreamRegistry};

// Configuration
pub use infrastructure::config::{ConfigError, ConnectionSettings, GatewaySettings, MuxConfig};
