//! Envelope Codec
//!
//! JSON encoding and decoding for the gateway wire format. Every frame is
//! a single envelope object; the gateway never batches frames into arrays.
//!
//! Decoding failures are non-fatal by contract: the channel manager drops
//! the frame, logs it, and keeps the connection.

use crate::domain::filter::{ControlAction, SubscriptionFilter};
use crate::domain::message::StreamMessage;

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON parsing or serialization failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// The frame was valid JSON but not an envelope object.
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),
}

/// JSON codec for gateway envelopes.
#[derive(Debug, Default, Clone)]
pub struct EnvelopeCodec;

impl EnvelopeCodec {
    /// Create a new codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode one inbound frame into a [`StreamMessage`].
    ///
    /// # Errors
    ///
    /// Returns an error when the frame is not valid JSON, is not an
    /// object, or does not match any known envelope shape.
    pub fn decode(&self, text: &str) -> Result<StreamMessage, CodecError> {
        let trimmed = text.trim();
        if !trimmed.starts_with('{') {
            let preview: String = trimmed.chars().take(40).collect();
            return Err(CodecError::InvalidEnvelope(format!(
                "expected JSON object, got: {preview}"
            )));
        }
        Ok(serde_json::from_str(trimmed)?)
    }

    /// Encode the subscribe envelope for a filter.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode_subscribe(&self, filter: &SubscriptionFilter) -> Result<String, CodecError> {
        self.encode_control(filter, ControlAction::Subscribe)
    }

    /// Encode the in-place filter-replacement envelope for a filter.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode_filter_update(&self, filter: &SubscriptionFilter) -> Result<String, CodecError> {
        self.encode_control(filter, ControlAction::Filter)
    }

    fn encode_control(
        &self,
        filter: &SubscriptionFilter,
        action: ControlAction,
    ) -> Result<String, CodecError> {
        Ok(serde_json::to_string(&filter.to_control_envelope(action))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::message::{StreamKind, StreamPayload};

    #[test]
    fn decode_metric_envelope() {
        let codec = EnvelopeCodec::new();
        let frame = r#"{
            "type": "metric",
            "data": {"name": "mem.used", "value": 1024.0, "unit": "MiB", "source": "node-3"},
            "timestamp": "2024-01-01T00:00:00Z"
        }"#;

        let msg = codec.decode(frame).unwrap();
        assert_eq!(msg.kind(), StreamKind::Metric);
    }

    #[test]
    fn decode_rejects_non_json() {
        let codec = EnvelopeCodec::new();
        assert!(matches!(
            codec.decode("not json at all"),
            Err(CodecError::InvalidEnvelope(_))
        ));
    }

    #[test]
    fn decode_rejects_json_array() {
        let codec = EnvelopeCodec::new();
        assert!(matches!(
            codec.decode(r#"[{"type": "metric"}]"#),
            Err(CodecError::InvalidEnvelope(_))
        ));
    }

    #[test]
    fn decode_rejects_missing_timestamp() {
        let codec = EnvelopeCodec::new();
        let frame = r#"{"type": "log", "data": {"level": "info", "message": "m", "source": "s"}}"#;
        assert!(matches!(codec.decode(frame), Err(CodecError::Json(_))));
    }

    #[test]
    fn decode_rejects_unknown_type() {
        let codec = EnvelopeCodec::new();
        let frame = r#"{"type": "gauge", "data": {}, "timestamp": "2024-01-01T00:00:00Z"}"#;
        assert!(codec.decode(frame).is_err());
    }

    #[test]
    fn decode_tolerates_surrounding_whitespace() {
        let codec = EnvelopeCodec::new();
        let frame = "\n  {\"type\": \"system\", \"data\": {\"type\": \"pong\"}, \"timestamp\": \"2024-01-01T00:00:00Z\"}  ";
        let msg = codec.decode(frame).unwrap();
        assert!(matches!(msg.payload, StreamPayload::System(_)));
    }

    #[test]
    fn encode_subscribe_envelope() {
        let codec = EnvelopeCodec::new();
        let filter = SubscriptionFilter::new().with_field("source", "node-1");

        let frame = codec.encode_subscribe(&filter).unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["type"], "system");
        assert_eq!(value["data"]["action"], "subscribe");
        assert_eq!(value["data"]["source"], "node-1");
    }

    #[test]
    fn encode_filter_update_envelope() {
        let codec = EnvelopeCodec::new();
        let filter = SubscriptionFilter::new().with_field("query", "level:warn");

        let frame = codec.encode_filter_update(&filter).unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["data"]["action"], "filter");
        assert_eq!(value["data"]["query"], "level:warn");
    }
}
