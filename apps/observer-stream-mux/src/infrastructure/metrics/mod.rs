//! Metrics Instrumentation
//!
//! Records stream health through the `metrics` facade:
//!
//! - **Messages**: received counts by domain and kind, dropped frames
//! - **Connections**: per-domain connected gauge, reconnect attempts
//!
//! The crate only records; installing a recorder/exporter is the
//! embedding process's decision. Without one, every call is a no-op.

use metrics::{counter, describe_counter, describe_gauge, gauge};

use crate::domain::channel::{ChannelDomain, ConnectionState};
use crate::domain::message::StreamKind;

/// Register descriptions for every metric this crate records.
///
/// Call once after installing a recorder.
pub fn describe_metrics() {
    describe_counter!(
        "stream_mux_messages_received_total",
        "Telemetry messages received and fanned out, by domain and kind"
    );
    describe_counter!(
        "stream_mux_frames_dropped_total",
        "Inbound frames dropped because they failed to decode"
    );
    describe_counter!(
        "stream_mux_reconnects_total",
        "Reconnect attempts scheduled, by domain"
    );
    describe_gauge!(
        "stream_mux_channel_connected",
        "1 while the domain's channel is connected, else 0"
    );
}

/// Record a decoded message fanned out to consumers.
pub fn record_message_received(domain: ChannelDomain, kind: StreamKind) {
    counter!(
        "stream_mux_messages_received_total",
        "domain" => domain.as_str(),
        "kind" => kind.as_str()
    )
    .increment(1);
}

/// Record an inbound frame dropped as malformed.
pub fn record_frame_dropped(domain: ChannelDomain) {
    counter!(
        "stream_mux_frames_dropped_total",
        "domain" => domain.as_str()
    )
    .increment(1);
}

/// Record a scheduled reconnect attempt.
pub fn record_reconnect(domain: ChannelDomain) {
    counter!(
        "stream_mux_reconnects_total",
        "domain" => domain.as_str()
    )
    .increment(1);
}

/// Reflect a connection state change on the connected gauge.
pub fn record_connection_state(domain: ChannelDomain, state: ConnectionState) {
    let connected = if state == ConnectionState::Connected {
        1.0
    } else {
        0.0
    };
    gauge!(
        "stream_mux_channel_connected",
        "domain" => domain.as_str()
    )
    .set(connected);
}
