//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Configuration loading.
pub mod config;

/// Gateway WebSocket adapters (channel manager, codec, backoff, transport).
pub mod gateway;

/// Metrics instrumentation.
pub mod metrics;

/// Channel registry and lifecycle.
pub mod registry;

/// Tracing setup.
pub mod telemetry;
