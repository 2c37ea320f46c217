//! Telemetry Message Envelope
//!
//! Wire format types for messages exchanged with the stream gateway.
//! Every frame is a JSON envelope `{type, data, timestamp}` where `type`
//! selects the shape of `data`. Decoded messages are immutable; the `type`
//! tag and payload shape always agree because they are one Rust enum.
//!
//! # Wire Format
//!
//! ```json
//! {
//!   "type": "metric",
//!   "data": {"name": "cpu.usage", "value": 42.5, "unit": "%",
//!            "source": "node-1", "labels": {"region": "eu-1"}},
//!   "timestamp": "2024-01-01T00:00:00Z"
//! }
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Envelope
// =============================================================================

/// A decoded telemetry message as delivered to consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamMessage {
    /// The typed payload; the wire `type` tag is derived from the variant.
    #[serde(flatten)]
    pub payload: StreamPayload,

    /// Gateway-assigned emission time (RFC 3339).
    pub timestamp: DateTime<Utc>,
}

impl StreamMessage {
    /// Get the payload kind of this message.
    #[must_use]
    pub const fn kind(&self) -> StreamKind {
        self.payload.kind()
    }
}

/// Payload of a [`StreamMessage`], tagged by the wire `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum StreamPayload {
    /// A metric sample.
    Metric(MetricPayload),
    /// A log line.
    Log(LogPayload),
    /// A trace span update.
    Trace(TracePayload),
    /// A platform event.
    Event(EventPayload),
    /// An alert notification.
    Alert(AlertPayload),
    /// A gateway control message (acks, errors, pongs). Shape is
    /// gateway-defined, so it is kept as raw JSON.
    System(serde_json::Value),
}

impl StreamPayload {
    /// Get the kind discriminant for this payload.
    #[must_use]
    pub const fn kind(&self) -> StreamKind {
        match self {
            Self::Metric(_) => StreamKind::Metric,
            Self::Log(_) => StreamKind::Log,
            Self::Trace(_) => StreamKind::Trace,
            Self::Event(_) => StreamKind::Event,
            Self::Alert(_) => StreamKind::Alert,
            Self::System(_) => StreamKind::System,
        }
    }
}

/// Message kind discriminant, mirroring the wire `type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// Metric sample.
    Metric,
    /// Log line.
    Log,
    /// Trace span update.
    Trace,
    /// Platform event.
    Event,
    /// Alert notification.
    Alert,
    /// Gateway control message.
    System,
}

impl StreamKind {
    /// Get the kind name as used on the wire and in metrics labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Log => "log",
            Self::Trace => "trace",
            Self::Event => "event",
            Self::Alert => "alert",
            Self::System => "system",
        }
    }
}

// =============================================================================
// Payloads
// =============================================================================

/// A single metric sample from the metrics channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPayload {
    /// Metric name, e.g. `cpu.usage`.
    pub name: String,
    /// Sampled value.
    pub value: f64,
    /// Unit of the value, e.g. `%` or `ms`.
    pub unit: String,
    /// Emitting source (host, service, or agent id).
    pub source: String,
    /// Free-form dimension labels.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
}

/// A log line from the logs channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogPayload {
    /// Severity level as reported by the source.
    pub level: String,
    /// Log message body.
    pub message: String,
    /// Emitting source.
    pub source: String,
    /// Correlated trace id, when the line was emitted inside a trace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    /// Correlated span id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
}

/// A span update from the traces channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TracePayload {
    /// Trace the span belongs to.
    pub trace_id: String,
    /// Span identifier.
    pub span_id: String,
    /// Operation name.
    pub operation: String,
    /// Span duration in milliseconds.
    pub duration_ms: f64,
    /// Completion status, e.g. `ok` or `error`.
    pub status: String,
    /// Emitting source.
    pub source: String,
}

/// A platform event from the events channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPayload {
    /// Event name, e.g. `deployment.finished`.
    pub name: String,
    /// Human-readable description.
    pub message: String,
    /// Emitting source.
    pub source: String,
    /// Free-form event attributes.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// An alert notification from the alerts channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPayload {
    /// Alert instance id.
    pub id: String,
    /// Alert rule name.
    pub name: String,
    /// Severity classification.
    pub severity: AlertSeverity,
    /// Alert description.
    pub message: String,
    /// Source the alert fired on.
    pub source: String,
    /// When the alert rule first triggered.
    pub triggered_at: DateTime<Utc>,
}

/// Severity of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Informational only.
    Info,
    /// Low severity.
    Low,
    /// Medium severity.
    Medium,
    /// High severity.
    High,
    /// Critical; paging-level.
    Critical,
}

impl AlertSeverity {
    /// Get the severity name as used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}
