//! Gateway Adapters
//!
//! Everything that talks to the Observer-Eye stream gateway:
//!
//! - **channel**: per-domain connection lifecycle and fan-out
//! - **codec**: JSON envelope encoding/decoding
//! - **reconnect**: deterministic exponential backoff
//! - **transport**: WebSocket connector and socket pump

pub mod channel;
pub mod codec;
pub mod reconnect;
pub mod transport;

pub use channel::{ChannelError, ChannelManager, ChannelSettings, DEFAULT_BROADCAST_CAPACITY};
pub use codec::{CodecError, EnvelopeCodec};
pub use reconnect::{BackoffConfig, BackoffPolicy};
pub use transport::{HeartbeatConfig, WsConnector};
