//! In-memory transport for driving channel managers in tests.
//!
//! The fake connector serves scripted outcomes: each `connect` call pops
//! the next queued outcome, or is refused once the script runs dry. An
//! accepted connect hands the test a [`FakeGateway`] — the server side of
//! the link — to observe outbound frames, push inbound frames, and drop
//! the connection.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;

use observer_stream_mux::{Connector, ConnectionState, TransportError, TransportLink};

/// Generous bound for awaiting events; effectively free under a paused clock.
pub const WAIT: Duration = Duration::from_secs(120);

enum ConnectOutcome {
    Refuse,
    Accept(TransportLink),
}

/// The gateway side of one accepted connection.
pub struct FakeGateway {
    sent: mpsc::Receiver<String>,
    push: Option<mpsc::Sender<String>>,
}

impl FakeGateway {
    /// Receive the next frame the client sent, parsed as JSON.
    pub async fn sent_frame(&mut self) -> serde_json::Value {
        let raw = tokio::time::timeout(WAIT, self.sent.recv())
            .await
            .expect("timed out waiting for an outbound frame")
            .expect("client dropped the connection");
        serde_json::from_str(&raw).expect("outbound frame is not JSON")
    }

    /// Deliver a raw frame to the client.
    pub async fn push_frame(&self, raw: &str) {
        self.push
            .as_ref()
            .expect("connection already dropped")
            .send(raw.to_string())
            .await
            .expect("client side of the link is gone");
    }

    /// Drop the connection from the gateway side.
    pub fn drop_connection(&mut self) {
        self.push = None;
    }

    /// Check that the client has sent nothing so far.
    pub fn sent_nothing(&mut self) -> bool {
        matches!(self.sent.try_recv(), Err(mpsc::error::TryRecvError::Empty))
    }
}

/// Scripted [`Connector`] with connection bookkeeping.
#[derive(Default)]
pub struct FakeConnector {
    outcomes: Mutex<VecDeque<ConnectOutcome>>,
    connect_times: Mutex<Vec<Instant>>,
}

impl FakeConnector {
    /// Create a connector with an empty script: every connect is refused.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue an accepted connection; returns its gateway side.
    pub fn queue_accept(&self) -> FakeGateway {
        let (outbound_tx, outbound_rx) = mpsc::channel(64);
        let (inbound_tx, inbound_rx) = mpsc::channel(64);

        self.outcomes
            .lock()
            .push_back(ConnectOutcome::Accept(TransportLink {
                outbound: outbound_tx,
                inbound: inbound_rx,
            }));

        FakeGateway {
            sent: outbound_rx,
            push: Some(inbound_tx),
        }
    }

    /// Queue `count` refused connection attempts.
    pub fn queue_refusals(&self, count: usize) {
        let mut outcomes = self.outcomes.lock();
        for _ in 0..count {
            outcomes.push_back(ConnectOutcome::Refuse);
        }
    }

    /// Number of connect calls seen so far.
    pub fn connect_count(&self) -> usize {
        self.connect_times.lock().len()
    }

    /// Timestamps of every connect call, in order.
    pub fn connect_times(&self) -> Vec<Instant> {
        self.connect_times.lock().clone()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, _url: &str) -> Result<TransportLink, TransportError> {
        self.connect_times.lock().push(Instant::now());
        match self.outcomes.lock().pop_front() {
            Some(ConnectOutcome::Accept(link)) => Ok(link),
            Some(ConnectOutcome::Refuse) | None => {
                Err(TransportError::ConnectFailed("connection refused".to_string()))
            }
        }
    }
}

/// Await a specific connection state on a watch receiver.
pub async fn wait_for_state(
    state_rx: &mut tokio::sync::watch::Receiver<ConnectionState>,
    target: ConnectionState,
) {
    let result = tokio::time::timeout(WAIT, async {
        loop {
            if *state_rx.borrow_and_update() == target {
                return;
            }
            state_rx
                .changed()
                .await
                .expect("state channel dropped while waiting");
        }
    })
    .await;
    assert!(result.is_ok(), "timed out waiting for state {target}");
}
