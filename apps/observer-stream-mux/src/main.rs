//! Observer Stream Mux Binary
//!
//! Tails the configured gateway channels and logs every received message.
//! Useful for smoke-testing a gateway deployment and as a reference
//! consumer of the multiplexer.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin observer-stream-mux
//! ```
//!
//! # Environment Variables
//!
//! - `STREAM_GATEWAY_URL`: Gateway base URL (default: `ws://localhost:8400/api/v1/stream`)
//! - `STREAM_CHANNELS`: Comma-separated domains to tail (default: `metrics,logs,alerts`)
//! - `STREAM_RECONNECT_INITIAL_MS` / `STREAM_RECONNECT_MAX_MS` /
//!   `STREAM_RECONNECT_ATTEMPTS`: Backoff tuning
//! - `STREAM_HEARTBEAT_INTERVAL_SECS` / `STREAM_HEARTBEAT_TIMEOUT_SECS`: Keepalive tuning
//! - `RUST_LOG`: Log filter (default: info)

use std::sync::Arc;

use observer_stream_mux::infrastructure::{metrics, telemetry};
use observer_stream_mux::{
    ChannelDomain, ChannelManager, MuxConfig, StreamMessage, StreamPayload, StreamRegistry,
};
use tokio::signal;
use tokio::sync::broadcast;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    telemetry::init();
    metrics::describe_metrics();

    let config = MuxConfig::from_env()?;
    log_config(&config);

    let registry = Arc::new(StreamRegistry::with_defaults(config.gateway.clone()));

    for domain in &config.domains {
        let manager = registry.get_channel(*domain);
        let feed = manager.open(None);

        tokio::spawn(watch_state(Arc::clone(&manager)));
        tokio::spawn(tail_channel(*domain, feed));
    }

    await_shutdown().await;

    registry.close_all();
    tracing::info!("stream mux stopped");
    Ok(())
}

/// Log every message arriving on one channel until its stream completes.
async fn tail_channel(domain: ChannelDomain, mut feed: broadcast::Receiver<StreamMessage>) {
    loop {
        match feed.recv().await {
            Ok(message) => log_message(domain, &message),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(domain = %domain, skipped, "consumer lagged behind");
            }
            Err(broadcast::error::RecvError::Closed) => {
                tracing::info!(domain = %domain, "stream completed");
                return;
            }
        }
    }
}

/// Log connection state transitions for one channel.
async fn watch_state(manager: Arc<ChannelManager>) {
    let mut state_rx = manager.connection_state();
    loop {
        let state = *state_rx.borrow_and_update();
        tracing::info!(domain = %manager.domain(), state = %state, "channel state");
        if state.is_terminal() || state_rx.changed().await.is_err() {
            return;
        }
    }
}

fn log_message(domain: ChannelDomain, message: &StreamMessage) {
    match &message.payload {
        StreamPayload::Metric(metric) => tracing::info!(
            domain = %domain,
            name = %metric.name,
            value = metric.value,
            unit = %metric.unit,
            source = %metric.source,
            "metric"
        ),
        StreamPayload::Log(log) => tracing::info!(
            domain = %domain,
            level = %log.level,
            source = %log.source,
            message = %log.message,
            "log"
        ),
        StreamPayload::Trace(trace) => tracing::info!(
            domain = %domain,
            trace_id = %trace.trace_id,
            operation = %trace.operation,
            duration_ms = trace.duration_ms,
            "trace"
        ),
        StreamPayload::Event(event) => tracing::info!(
            domain = %domain,
            name = %event.name,
            source = %event.source,
            "event"
        ),
        StreamPayload::Alert(alert) => tracing::warn!(
            domain = %domain,
            id = %alert.id,
            severity = %alert.severity.as_str(),
            message = %alert.message,
            "alert"
        ),
        StreamPayload::System(value) => tracing::debug!(
            domain = %domain,
            payload = %value,
            "system"
        ),
    }
}

/// Load .env from the current directory or any ancestor.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

fn log_config(config: &MuxConfig) {
    let domains: Vec<&str> = config.domains.iter().map(|d| d.as_str()).collect();
    tracing::info!(
        gateway = %config.gateway.base_url,
        channels = domains.join(","),
        reconnect_attempts = config.gateway.connection.max_reconnect_attempts,
        "configuration loaded"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is required for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is required for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received Ctrl+C, shutting down");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, shutting down");
        }
    }
}
