//! Subscription Filters
//!
//! A channel carries exactly one active filter at a time (last write wins).
//! The filter is sent to the gateway inside a `system` control envelope on
//! every successful connect, and again whenever the consumer replaces it
//! while connected.
//!
//! # Control Envelope
//!
//! ```json
//! {"type": "system", "data": {"action": "subscribe", "source": "node-1", "limit": 100}}
//! {"type": "system", "data": {"action": "filter", "query": "level:error"}}
//! ```
//!
//! Filter fields are flattened directly into `data` next to the `action`
//! key; `action` is written last, so a filter field of the same name can
//! never override it.

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

/// Outbound control action for a subscription envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    /// Initial subscription, sent on every successful connect.
    Subscribe,
    /// In-place filter replacement on a live connection.
    Filter,
}

impl ControlAction {
    /// Get the action name as used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Subscribe => "subscribe",
            Self::Filter => "filter",
        }
    }
}

/// The subscription filter attached to one channel.
///
/// An empty filter means "everything": no subscribe envelope is sent for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionFilter {
    fields: BTreeMap<String, Value>,
    limit: Option<u32>,
    since: Option<String>,
}

impl SubscriptionFilter {
    /// Create an empty filter.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fields: BTreeMap::new(),
            limit: None,
            since: None,
        }
    }

    /// Add a filter field, replacing any previous value for the key.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Cap the number of messages the gateway should deliver.
    #[must_use]
    pub const fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resume from a gateway-issued cursor.
    #[must_use]
    pub fn with_since(mut self, since: impl Into<String>) -> Self {
        self.since = Some(since.into());
        self
    }

    /// Check whether the filter carries no fields, limit, or cursor.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.limit.is_none() && self.since.is_none()
    }

    /// Get a filter field by key.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Build the control envelope carrying this filter.
    #[must_use]
    pub fn to_control_envelope(&self, action: ControlAction) -> Value {
        let mut data = Map::new();
        for (key, value) in &self.fields {
            data.insert(key.clone(), value.clone());
        }
        if let Some(limit) = self.limit {
            data.insert("limit".to_string(), Value::from(limit));
        }
        if let Some(since) = &self.since {
            data.insert("since".to_string(), Value::from(since.clone()));
        }
        // Written last; wins over any same-named filter field.
        data.insert("action".to_string(), Value::from(action.as_str()));

        json!({
            "type": "system",
            "data": Value::Object(data),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter() {
        assert!(SubscriptionFilter::new().is_empty());
        assert!(!SubscriptionFilter::new().with_limit(10).is_empty());
        assert!(!SubscriptionFilter::new().with_since("cursor-1").is_empty());
        assert!(
            !SubscriptionFilter::new()
                .with_field("source", "node-1")
                .is_empty()
        );
    }

    #[test]
    fn subscribe_envelope_flattens_fields() {
        let filter = SubscriptionFilter::new()
            .with_field("source", "node-1")
            .with_limit(100);

        let envelope = filter.to_control_envelope(ControlAction::Subscribe);
        assert_eq!(envelope["type"], "system");
        assert_eq!(envelope["data"]["action"], "subscribe");
        assert_eq!(envelope["data"]["source"], "node-1");
        assert_eq!(envelope["data"]["limit"], 100);
        assert!(envelope["data"].get("since").is_none());
    }

    #[test]
    fn filter_envelope_uses_filter_action() {
        let filter = SubscriptionFilter::new().with_field("query", "level:error");

        let envelope = filter.to_control_envelope(ControlAction::Filter);
        assert_eq!(envelope["data"]["action"], "filter");
        assert_eq!(envelope["data"]["query"], "level:error");
    }

    #[test]
    fn field_replaces_previous_value() {
        let filter = SubscriptionFilter::new()
            .with_field("source", "node-1")
            .with_field("source", "node-2");

        assert_eq!(filter.field("source"), Some(&Value::from("node-2")));
    }

    #[test]
    fn action_key_cannot_be_shadowed() {
        let filter = SubscriptionFilter::new().with_field("action", "unsubscribe");

        let envelope = filter.to_control_envelope(ControlAction::Subscribe);
        assert_eq!(envelope["data"]["action"], "subscribe");
    }

    #[test]
    fn since_cursor_is_carried() {
        let filter = SubscriptionFilter::new().with_since("2024-01-01T00:00:00Z");

        let envelope = filter.to_control_envelope(ControlAction::Subscribe);
        assert_eq!(envelope["data"]["since"], "2024-01-01T00:00:00Z");
    }
}
