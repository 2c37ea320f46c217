//! Stream Registry
//!
//! Process-level owner of the channel managers. The registry is an
//! explicitly constructed context object passed to whoever needs feeds —
//! there is no ambient global. It guarantees at most one manager (and so
//! at most one transport) per domain, even under concurrent requests, and
//! provides a single shutdown point.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::application::ports::Connector;
use crate::domain::channel::{ChannelDomain, ConnectionState};
use crate::infrastructure::config::GatewaySettings;
use crate::infrastructure::gateway::channel::{ChannelManager, ChannelSettings};
use crate::infrastructure::gateway::transport::WsConnector;

/// Snapshot of registry state, for health reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Number of managed channels.
    pub channels: usize,
    /// Number of channels currently connected.
    pub connected: usize,
}

/// Owns at most one [`ChannelManager`] per telemetry domain.
///
/// Managers are created lazily on first request and torn down together by
/// [`Self::close_all`]. Dropping the registry does not close channels;
/// shutdown is explicit.
///
/// # Example
///
/// ```rust,no_run
/// use observer_stream_mux::domain::channel::ChannelDomain;
/// use observer_stream_mux::domain::filter::SubscriptionFilter;
/// use observer_stream_mux::infrastructure::config::GatewaySettings;
/// use observer_stream_mux::infrastructure::registry::StreamRegistry;
///
/// # async fn example() {
/// let registry = StreamRegistry::with_defaults(GatewaySettings::default());
///
/// let metrics = registry.get_channel(ChannelDomain::Metrics);
/// let mut feed = metrics.open(Some(
///     SubscriptionFilter::new().with_field("source", "node-1"),
/// ));
///
/// while let Ok(message) = feed.recv().await {
///     println!("{message:?}");
/// }
///
/// registry.close_all();
/// # }
/// ```
pub struct StreamRegistry {
    settings: GatewaySettings,
    connector: Arc<dyn Connector>,
    channels: Mutex<HashMap<ChannelDomain, Arc<ChannelManager>>>,
}

impl StreamRegistry {
    /// Create a registry using the given connector.
    #[must_use]
    pub fn new(settings: GatewaySettings, connector: Arc<dyn Connector>) -> Self {
        Self {
            settings,
            connector,
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Create a registry backed by the production WebSocket connector.
    #[must_use]
    pub fn with_defaults(settings: GatewaySettings) -> Self {
        let connector = Arc::new(WsConnector::new(settings.heartbeat()));
        Self::new(settings, connector)
    }

    /// Get the manager for a domain, creating it on first request.
    ///
    /// The internal lock makes creation idempotent under concurrency: two
    /// near-simultaneous calls for the same domain observe the same
    /// manager and no second transport is ever created.
    #[must_use]
    pub fn get_channel(&self, domain: ChannelDomain) -> Arc<ChannelManager> {
        let mut channels = self.channels.lock();
        Arc::clone(channels.entry(domain).or_insert_with(|| {
            tracing::debug!(domain = %domain, "creating channel manager");
            Arc::new(ChannelManager::new(
                domain,
                self.channel_settings(domain),
                Arc::clone(&self.connector),
            ))
        }))
    }

    /// Close every managed channel and forget it.
    ///
    /// Idempotent; used at application shutdown. Channels requested after
    /// this call start fresh.
    pub fn close_all(&self) {
        let drained: Vec<Arc<ChannelManager>> = {
            let mut channels = self.channels.lock();
            channels.drain().map(|(_, manager)| manager).collect()
        };

        if !drained.is_empty() {
            tracing::info!(channels = drained.len(), "closing all channels");
        }
        for manager in drained {
            manager.close();
        }
    }

    /// Check whether any managed channel is currently connected.
    #[must_use]
    pub fn is_any_connected(&self) -> bool {
        self.channels
            .lock()
            .values()
            .any(|manager| manager.state() == ConnectionState::Connected)
    }

    /// Get a snapshot of registry state.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        let channels = self.channels.lock();
        RegistryStats {
            channels: channels.len(),
            connected: channels
                .values()
                .filter(|manager| manager.state() == ConnectionState::Connected)
                .count(),
        }
    }

    fn channel_settings(&self, domain: ChannelDomain) -> ChannelSettings {
        ChannelSettings {
            url: self.settings.url_for(domain),
            backoff: self.settings.backoff(),
            broadcast_capacity: self.settings.broadcast_capacity,
        }
    }
}

impl std::fmt::Debug for StreamRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamRegistry")
            .field("settings", &self.settings)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
