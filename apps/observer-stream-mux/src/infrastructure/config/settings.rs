//! Multiplexer Configuration Settings
//!
//! Configuration types for the stream multiplexer, loaded from
//! environment variables.

use std::time::Duration;

use crate::domain::channel::ChannelDomain;
use crate::infrastructure::gateway::channel::DEFAULT_BROADCAST_CAPACITY;
use crate::infrastructure::gateway::reconnect::BackoffConfig;
use crate::infrastructure::gateway::transport::HeartbeatConfig;

/// Default stream gateway base URL.
pub const DEFAULT_GATEWAY_URL: &str = "ws://localhost:8400/api/v1/stream";

/// Connection-level settings shared by every channel.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Heartbeat ping interval.
    pub heartbeat_interval: Duration,
    /// Silence tolerated after a ping before the connection is declared dead.
    pub heartbeat_timeout: Duration,
    /// Delay before the first reconnect attempt.
    pub reconnect_delay_initial: Duration,
    /// Upper bound on any reconnect delay.
    pub reconnect_delay_max: Duration,
    /// Consecutive failures tolerated before a channel closes for good.
    pub max_reconnect_attempts: u32,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(20),
            heartbeat_timeout: Duration::from_secs(40),
            reconnect_delay_initial: Duration::from_millis(1000),
            reconnect_delay_max: Duration::from_millis(30_000),
            max_reconnect_attempts: 5,
        }
    }
}

/// Stream gateway settings.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Base URL; channel endpoints live at `{base_url}/{domain}`.
    pub base_url: String,
    /// Connection-level settings.
    pub connection: ConnectionSettings,
    /// Capacity of each channel's broadcast buffer.
    pub broadcast_capacity: usize,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GATEWAY_URL.to_string(),
            connection: ConnectionSettings::default(),
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
        }
    }
}

impl GatewaySettings {
    /// Get the WebSocket endpoint for a domain.
    #[must_use]
    pub fn url_for(&self, domain: ChannelDomain) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), domain)
    }

    /// Build the backoff configuration for a channel.
    #[must_use]
    pub const fn backoff(&self) -> BackoffConfig {
        BackoffConfig {
            initial_delay: self.connection.reconnect_delay_initial,
            max_delay: self.connection.reconnect_delay_max,
            max_attempts: self.connection.max_reconnect_attempts,
        }
    }

    /// Build the heartbeat configuration for the connector.
    #[must_use]
    pub const fn heartbeat(&self) -> HeartbeatConfig {
        HeartbeatConfig {
            interval: self.connection.heartbeat_interval,
            timeout: self.connection.heartbeat_timeout,
        }
    }
}

/// Complete multiplexer configuration.
#[derive(Debug, Clone)]
pub struct MuxConfig {
    /// Gateway settings.
    pub gateway: GatewaySettings,
    /// Domains the binary should open on startup.
    pub domains: Vec<ChannelDomain>,
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self {
            gateway: GatewaySettings::default(),
            domains: vec![
                ChannelDomain::Metrics,
                ChannelDomain::Logs,
                ChannelDomain::Alerts,
            ],
        }
    }
}

impl MuxConfig {
    /// Create configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `STREAM_GATEWAY_URL` | `ws://localhost:8400/api/v1/stream` |
    /// | `STREAM_CHANNELS` | `metrics,logs,alerts` |
    /// | `STREAM_RECONNECT_INITIAL_MS` | `1000` |
    /// | `STREAM_RECONNECT_MAX_MS` | `30000` |
    /// | `STREAM_RECONNECT_ATTEMPTS` | `5` |
    /// | `STREAM_HEARTBEAT_INTERVAL_SECS` | `20` |
    /// | `STREAM_HEARTBEAT_TIMEOUT_SECS` | `40` |
    /// | `STREAM_BROADCAST_CAPACITY` | `1024` |
    ///
    /// # Errors
    ///
    /// Returns an error when a variable is set but cannot be parsed, or
    /// `STREAM_CHANNELS` names an unknown domain.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = ConnectionSettings::default();

        let base_url =
            std::env::var("STREAM_GATEWAY_URL").unwrap_or_else(|_| DEFAULT_GATEWAY_URL.to_string());

        let domains = match std::env::var("STREAM_CHANNELS") {
            Ok(raw) => parse_domains(&raw)?,
            Err(_) => Self::default().domains,
        };

        let connection = ConnectionSettings {
            heartbeat_interval: Duration::from_secs(parse_env_u64(
                "STREAM_HEARTBEAT_INTERVAL_SECS",
                defaults.heartbeat_interval.as_secs(),
            )?),
            heartbeat_timeout: Duration::from_secs(parse_env_u64(
                "STREAM_HEARTBEAT_TIMEOUT_SECS",
                defaults.heartbeat_timeout.as_secs(),
            )?),
            reconnect_delay_initial: Duration::from_millis(parse_env_u64(
                "STREAM_RECONNECT_INITIAL_MS",
                1000,
            )?),
            reconnect_delay_max: Duration::from_millis(parse_env_u64(
                "STREAM_RECONNECT_MAX_MS",
                30_000,
            )?),
            max_reconnect_attempts: parse_env_u32(
                "STREAM_RECONNECT_ATTEMPTS",
                defaults.max_reconnect_attempts,
            )?,
        };

        let broadcast_capacity =
            parse_env_usize("STREAM_BROADCAST_CAPACITY", DEFAULT_BROADCAST_CAPACITY)?;

        Ok(Self {
            gateway: GatewaySettings {
                base_url,
                connection,
                broadcast_capacity,
            },
            domains,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable is set to an unparseable value.
    #[error("invalid value for {var}: {value}")]
    InvalidValue {
        /// The offending variable name.
        var: &'static str,
        /// The raw value found.
        value: String,
    },

    /// `STREAM_CHANNELS` names a domain the gateway does not serve.
    #[error(transparent)]
    UnknownDomain(#[from] crate::domain::channel::UnknownDomain),

    /// `STREAM_CHANNELS` resolved to no domains at all.
    #[error("no stream channels configured")]
    NoChannels,
}

/// Parse a comma-separated domain list, e.g. `metrics,logs,alerts`.
pub fn parse_domains(raw: &str) -> Result<Vec<ChannelDomain>, ConfigError> {
    let mut domains = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let domain: ChannelDomain = part.parse()?;
        if !domains.contains(&domain) {
            domains.push(domain);
        }
    }
    if domains.is_empty() {
        return Err(ConfigError::NoChannels);
    }
    Ok(domains)
}

fn parse_env_u64(var: &'static str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value: raw }),
        Err(_) => Ok(default),
    }
}

fn parse_env_u32(var: &'static str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value: raw }),
        Err(_) => Ok(default),
    }
}

fn parse_env_usize(var: &'static str, default: usize) -> Result<usize, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value: raw }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_for_appends_domain() {
        let settings = GatewaySettings::default();
        assert_eq!(
            settings.url_for(ChannelDomain::Metrics),
            "ws://localhost:8400/api/v1/stream/metrics"
        );
    }

    #[test]
    fn url_for_tolerates_trailing_slash() {
        let settings = GatewaySettings {
            base_url: "wss://observer.example.com/api/v1/stream/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            settings.url_for(ChannelDomain::Alerts),
            "wss://observer.example.com/api/v1/stream/alerts"
        );
    }

    #[test]
    fn backoff_mirrors_connection_settings() {
        let settings = GatewaySettings::default();
        let backoff = settings.backoff();
        assert_eq!(backoff.initial_delay, Duration::from_millis(1000));
        assert_eq!(backoff.max_delay, Duration::from_millis(30_000));
        assert_eq!(backoff.max_attempts, 5);
    }

    #[test]
    fn default_domains_are_dashboard_feeds() {
        let config = MuxConfig::default();
        assert_eq!(
            config.domains,
            vec![
                ChannelDomain::Metrics,
                ChannelDomain::Logs,
                ChannelDomain::Alerts
            ]
        );
    }

    #[test]
    fn parse_domains_list() {
        let domains = parse_domains("metrics, logs,alerts").unwrap();
        assert_eq!(
            domains,
            vec![
                ChannelDomain::Metrics,
                ChannelDomain::Logs,
                ChannelDomain::Alerts
            ]
        );
    }

    #[test]
    fn parse_domains_deduplicates() {
        let domains = parse_domains("logs,logs,logs").unwrap();
        assert_eq!(domains, vec![ChannelDomain::Logs]);
    }

    #[test]
    fn parse_domains_rejects_unknown() {
        assert!(matches!(
            parse_domains("metrics,widgets"),
            Err(ConfigError::UnknownDomain(_))
        ));
    }

    #[test]
    fn parse_domains_rejects_empty() {
        assert!(matches!(parse_domains(" , "), Err(ConfigError::NoChannels)));
    }
}
