//! WebSocket Transport Tests
//!
//! Exercises the production connector against a real in-process
//! WebSocket server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use observer_stream_mux::{Connector, TransportError, WsConnector};

#[tokio::test]
async fn connector_round_trips_text_frames() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut socket = tokio_tungstenite::accept_async(stream).await.unwrap();

        // Echo the first text frame, then close.
        while let Some(message) = socket.next().await {
            match message.unwrap() {
                Message::Text(text) => {
                    socket.send(Message::Text(text)).await.unwrap();
                    break;
                }
                Message::Ping(payload) => {
                    socket.send(Message::Pong(payload)).await.unwrap();
                }
                _ => {}
            }
        }
        socket.close(None).await.ok();
    });

    let connector = WsConnector::default();
    let mut link = connector.connect(&format!("ws://{addr}")).await.unwrap();

    link.outbound
        .send(r#"{"type":"system","data":{"action":"subscribe"}}"#.to_string())
        .await
        .unwrap();

    let echoed = link.inbound.recv().await.unwrap();
    assert!(echoed.contains("subscribe"));

    // Server closed after the echo: the inbound half drains to None.
    assert!(link.inbound.recv().await.is_none());

    server.await.unwrap();
}

#[tokio::test]
async fn refused_connection_reports_connect_failure() {
    // Bind and immediately drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let connector = WsConnector::default();
    let result = connector.connect(&format!("ws://{addr}")).await;

    assert!(matches!(result, Err(TransportError::ConnectFailed(_))));
}

#[tokio::test]
async fn dropping_the_link_closes_the_socket() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut socket = tokio_tungstenite::accept_async(stream).await.unwrap();

        // Drain until the client goes away; report whether a close frame
        // or clean end-of-stream was seen.
        while let Some(message) = socket.next().await {
            match message {
                Ok(Message::Close(_)) | Err(_) => return true,
                _ => {}
            }
        }
        true
    });

    let connector = WsConnector::default();
    let link = connector.connect(&format!("ws://{addr}")).await.unwrap();

    drop(link);

    assert!(server.await.unwrap());
}
