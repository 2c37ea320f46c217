//! Domain Layer - Core telemetry streaming types.
//!
//! This layer contains the core domain types for telemetry streaming
//! with no transport dependencies. All types here are pure Rust with
//! serialization support.

/// Channel domains and connection lifecycle states.
pub mod channel;

/// Subscription filters and outbound control envelopes.
pub mod filter;

/// Telemetry message envelope and payload types.
pub mod message;
