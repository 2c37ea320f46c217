//! Tracing Setup
//!
//! Initializes the `tracing` subscriber for the binary: an `EnvFilter`
//! honoring `RUST_LOG` (defaulting to info for this crate) and a compact
//! fmt layer with targets.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Default filter directive when `RUST_LOG` is unset.
const DEFAULT_DIRECTIVES: &str = "observer_stream_mux=info,tokio_tungstenite=warn,tungstenite=warn";

/// Initialize the global tracing subscriber.
///
/// Call once at startup; later calls are ignored.
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}
