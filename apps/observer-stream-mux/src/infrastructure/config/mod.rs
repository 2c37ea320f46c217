//! Configuration
//!
//! Environment-driven settings for the multiplexer and its binary.

mod settings;

pub use settings::{
    ConfigError, ConnectionSettings, DEFAULT_GATEWAY_URL, GatewaySettings, MuxConfig,
    parse_domains,
};
