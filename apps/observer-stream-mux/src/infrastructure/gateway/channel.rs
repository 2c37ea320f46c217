//! Channel Manager
//!
//! One manager per telemetry domain. The manager owns at most one
//! transport connection at a time and runs an explicit connect/retry state
//! machine in a single task:
//!
//! 1. `open()` spawns the run task and hands back a broadcast receiver.
//! 2. On transport open the current filter is (re)sent, the retry budget
//!    resets, and consumers start receiving decoded messages.
//! 3. Malformed frames are dropped and logged; they never kill the
//!    connection.
//! 4. On connection loss the manager reconnects with exponential backoff
//!    until the retry budget is spent, then closes for good: the state
//!    signal reads `Closed` and every consumer's stream completes.
//!
//! All transport and timer events for one channel are serialized inside
//! the run task, so message handling and reconnect handling never
//! interleave. `close()` wins over anything the run task is doing.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, mpsc, watch};
use tokio_stream::wrappers::BroadcastStream;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{Connector, TransportError};
use crate::domain::channel::{ChannelDomain, ConnectionState};
use crate::domain::filter::SubscriptionFilter;
use crate::domain::message::StreamMessage;
use crate::infrastructure::metrics;

use super::codec::EnvelopeCodec;
use super::reconnect::{BackoffConfig, BackoffPolicy};

/// Default capacity of the per-channel broadcast buffer.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 1024;

/// Errors returned by channel manager operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// The channel is closed; a new `open()` call is required first.
    #[error("channel is closed")]
    Closed,
}

/// Settings for one channel manager.
#[derive(Debug, Clone)]
pub struct ChannelSettings {
    /// WebSocket endpoint for this channel's domain.
    pub url: String,
    /// Reconnection backoff configuration.
    pub backoff: BackoffConfig,
    /// Capacity of the broadcast buffer between the run task and consumers.
    pub broadcast_capacity: usize,
}

impl ChannelSettings {
    /// Create settings for an endpoint URL with default backoff and capacity.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            backoff: BackoffConfig::default(),
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
        }
    }
}

/// Commands pushed from the public API into the run task.
enum Command {
    /// Send a filter-replacement envelope on the live connection.
    SendFilter(SubscriptionFilter),
}

/// Handles owned while a run task is alive.
struct RunHandle {
    messages_tx: broadcast::Sender<StreamMessage>,
    commands_tx: mpsc::UnboundedSender<Command>,
    cancel: CancellationToken,
}

/// Manages the connection lifecycle of one telemetry channel.
///
/// Created by the [`StreamRegistry`](crate::infrastructure::registry::StreamRegistry);
/// consumers interact with it through `open`, `update_filter`, `close`,
/// and `connection_state`.
pub struct ChannelManager {
    domain: ChannelDomain,
    settings: ChannelSettings,
    connector: Arc<dyn Connector>,
    codec: EnvelopeCodec,
    filter: RwLock<SubscriptionFilter>,
    state_tx: watch::Sender<ConnectionState>,
    core: Mutex<Option<RunHandle>>,
}

impl ChannelManager {
    /// Create a manager for a domain. No connection is opened yet.
    #[must_use]
    pub fn new(
        domain: ChannelDomain,
        settings: ChannelSettings,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let (state_tx, _state_rx) = watch::channel(ConnectionState::Disconnected);
        Self {
            domain,
            settings,
            connector,
            codec: EnvelopeCodec::new(),
            filter: RwLock::new(SubscriptionFilter::new()),
            state_tx,
            core: Mutex::new(None),
        }
    }

    /// Get the domain this manager serves.
    #[must_use]
    pub const fn domain(&self) -> ChannelDomain {
        self.domain
    }

    /// Open the channel and get a stream of decoded messages.
    ///
    /// Idempotent: while a connection is open or opening, further calls
    /// return additional receivers on the same broadcast channel and the
    /// `filter` argument is ignored (use [`Self::update_filter`] to change
    /// a live subscription). On a fresh or closed channel this stores the
    /// filter, transitions to `Connecting`, and spawns the run task.
    ///
    /// The receiver yields messages in arrival order and ends when the
    /// channel closes — whether by [`Self::close`] or retry exhaustion.
    pub fn open(
        self: &Arc<Self>,
        filter: Option<SubscriptionFilter>,
    ) -> broadcast::Receiver<StreamMessage> {
        let mut core = self.core.lock();

        if let Some(run) = core.as_ref() {
            return run.messages_tx.subscribe();
        }

        if let Some(filter) = filter {
            *self.filter.write() = filter;
        }

        let (messages_tx, messages_rx) = broadcast::channel(self.settings.broadcast_capacity);
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        *core = Some(RunHandle {
            messages_tx: messages_tx.clone(),
            commands_tx,
            cancel: cancel.clone(),
        });

        self.set_state(ConnectionState::Connecting);
        tokio::spawn(Arc::clone(self).run(messages_tx, commands_rx, cancel));

        messages_rx
    }

    /// Open the channel and get the feed as a futures `Stream`.
    ///
    /// Same semantics as [`Self::open`]; the stream yields
    /// `Err(BroadcastStreamRecvError::Lagged)` items when the consumer
    /// falls behind the broadcast buffer and ends when the channel closes.
    pub fn open_stream(
        self: &Arc<Self>,
        filter: Option<SubscriptionFilter>,
    ) -> BroadcastStream<StreamMessage> {
        BroadcastStream::new(self.open(filter))
    }

    /// Replace the active subscription filter.
    ///
    /// If the channel is `Connected` the new filter is sent immediately,
    /// ordered after all previously queued outbound frames. In any other
    /// live state it is stored and replayed on the next successful
    /// connect (last write wins).
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] when the channel is closed.
    pub fn update_filter(&self, filter: SubscriptionFilter) -> Result<(), ChannelError> {
        let core = self.core.lock();

        if self.state() == ConnectionState::Closed {
            return Err(ChannelError::Closed);
        }

        *self.filter.write() = filter.clone();

        if self.state() == ConnectionState::Connected
            && let Some(run) = core.as_ref()
        {
            // The run task may be tearing down concurrently; the filter is
            // stored above and replayed on reconnect either way.
            let _ = run.commands_tx.send(Command::SendFilter(filter));
        }

        Ok(())
    }

    /// Close the channel.
    ///
    /// Cancels any pending reconnect, releases the transport, completes
    /// every consumer's stream, and transitions to the terminal `Closed`
    /// state. Safe to call from any state; repeated calls are no-ops and
    /// produce no further transitions.
    pub fn close(&self) {
        let mut core = self.core.lock();

        if let Some(run) = core.take() {
            run.cancel.cancel();
        }

        let changed = self.state_tx.send_if_modified(|state| {
            if *state == ConnectionState::Closed {
                false
            } else {
                *state = ConnectionState::Closed;
                true
            }
        });

        if changed {
            metrics::record_connection_state(self.domain, ConnectionState::Closed);
            tracing::info!(domain = %self.domain, "channel closed");
        }
    }

    /// Observe connection state transitions.
    ///
    /// The receiver always holds the current state; every transition is
    /// published, though a slow reader may observe consecutive updates
    /// coalesced.
    #[must_use]
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Get the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Get a copy of the active subscription filter.
    #[must_use]
    pub fn current_filter(&self) -> SubscriptionFilter {
        self.filter.read().clone()
    }

    // =========================================================================
    // Run task
    // =========================================================================

    async fn run(
        self: Arc<Self>,
        messages_tx: broadcast::Sender<StreamMessage>,
        mut commands_rx: mpsc::UnboundedReceiver<Command>,
        cancel: CancellationToken,
    ) {
        let mut policy = BackoffPolicy::new(self.settings.backoff.clone());

        loop {
            if cancel.is_cancelled() {
                return;
            }

            let loss = match self
                .connect_and_stream(&messages_tx, &mut commands_rx, &cancel, &mut policy)
                .await
            {
                // Graceful end: close() owns the state transition.
                Ok(()) => return,
                Err(loss) => loss,
            };

            if cancel.is_cancelled() {
                return;
            }

            tracing::warn!(domain = %self.domain, error = %loss, "stream connection lost");

            if let Some(delay) = policy.next_delay() {
                self.set_state_guarded(&cancel, ConnectionState::Reconnecting);
                metrics::record_reconnect(self.domain);
                tracing::info!(
                    domain = %self.domain,
                    attempt = policy.attempt_count(),
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "scheduling reconnect"
                );

                tokio::select! {
                    () = cancel.cancelled() => return,
                    () = tokio::time::sleep(delay) => {}
                }
            } else {
                tracing::error!(
                    domain = %self.domain,
                    attempts = policy.attempt_count(),
                    "reconnect budget exhausted, closing channel"
                );
                self.finish_terminal(&cancel);
                return;
            }
        }
    }

    /// Connect once and stream until cancellation or connection loss.
    ///
    /// `Ok(())` means cancelled (graceful); `Err` is a loss the run loop
    /// feeds into the backoff policy.
    async fn connect_and_stream(
        &self,
        messages_tx: &broadcast::Sender<StreamMessage>,
        commands_rx: &mut mpsc::UnboundedReceiver<Command>,
        cancel: &CancellationToken,
        policy: &mut BackoffPolicy,
    ) -> Result<(), TransportError> {
        tracing::debug!(domain = %self.domain, url = %self.settings.url, "connecting");

        let mut link = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            result = self.connector.connect(&self.settings.url) => result?,
        };

        self.set_state_guarded(cancel, ConnectionState::Connected);
        policy.reset();
        tracing::info!(domain = %self.domain, "stream connected");

        let filter = self.filter.read().clone();
        if !filter.is_empty() {
            match self.codec.encode_subscribe(&filter) {
                Ok(frame) => link
                    .outbound
                    .send(frame)
                    .await
                    .map_err(|_| TransportError::Closed)?,
                Err(error) => {
                    tracing::error!(domain = %self.domain, error = %error, "subscribe envelope not sent");
                }
            }
        }

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(()),
                command = commands_rx.recv() => {
                    match command {
                        Some(Command::SendFilter(filter)) => {
                            match self.codec.encode_filter_update(&filter) {
                                Ok(frame) => link
                                    .outbound
                                    .send(frame)
                                    .await
                                    .map_err(|_| TransportError::Closed)?,
                                Err(error) => {
                                    tracing::error!(domain = %self.domain, error = %error, "filter envelope not sent");
                                }
                            }
                        }
                        // Sender dropped: the channel is being closed.
                        None => return Ok(()),
                    }
                }
                frame = link.inbound.recv() => {
                    match frame {
                        Some(text) => self.dispatch_frame(&text, messages_tx),
                        None => return Err(TransportError::Closed),
                    }
                }
            }
        }
    }

    /// Decode one inbound frame and fan it out.
    fn dispatch_frame(&self, text: &str, messages_tx: &broadcast::Sender<StreamMessage>) {
        match self.codec.decode(text) {
            Ok(message) => {
                metrics::record_message_received(self.domain, message.kind());
                // No active receivers is fine; the message is simply not kept.
                let _ = messages_tx.send(message);
            }
            Err(error) => {
                metrics::record_frame_dropped(self.domain);
                tracing::warn!(domain = %self.domain, error = %error, "dropping malformed frame");
            }
        }
    }

    // =========================================================================
    // State transitions
    // =========================================================================

    /// Publish a state change, deduplicating repeats of the same state.
    fn set_state(&self, next: ConnectionState) {
        let changed = self.state_tx.send_if_modified(|state| {
            if *state == next {
                false
            } else {
                *state = next;
                true
            }
        });

        if changed {
            metrics::record_connection_state(self.domain, next);
            tracing::debug!(domain = %self.domain, state = %next, "connection state changed");
        }
    }

    /// Publish a state change from the run task, unless `close()` already
    /// won the race; nothing may be emitted after the terminal transition.
    fn set_state_guarded(&self, cancel: &CancellationToken, next: ConnectionState) {
        let _core = self.core.lock();
        if cancel.is_cancelled() {
            return;
        }
        self.set_state(next);
    }

    /// Terminal close from the run task after retry exhaustion.
    fn finish_terminal(&self, cancel: &CancellationToken) {
        let mut core = self.core.lock();
        if cancel.is_cancelled() {
            // close() got there first and already published Closed.
            return;
        }
        // Dropping the handle completes consumer streams once the run
        // task's own sender clone goes away.
        *core = None;
        self.set_state(ConnectionState::Closed);
    }
}

impl std::fmt::Debug for ChannelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelManager")
            .field("domain", &self.domain)
            .field("url", &self.settings.url)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
