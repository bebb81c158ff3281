//! Shared fixtures for relay integration tests.
//!
//! `FakeFeed` stands in for Tiingo: it accepts WebSocket connections on
//! a loopback port and captures the first text frame of each as the
//! subscribe request. `Relay` serves the real router on an ephemeral
//! port.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, accept_async, connect_async};
use tokio_util::sync::CancellationToken;

use tiingo_relay::{ApiToken, FeedEndpoints, RelayConfig, RelayState, router};

/// Timeout for individual expectations against sockets.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Client-side connection to the relay.
pub type ClientWs = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Server-side connection accepted by the fake feed.
pub type ServerWs = WebSocketStream<TcpStream>;

// =============================================================================
// Fake Feed
// =============================================================================

/// One accepted feed connection with its captured subscribe frame.
pub struct FeedSession {
    pub subscribe: String,
    pub socket: ServerWs,
}

/// Fake Tiingo feed bound to a loopback port.
pub struct FakeFeed {
    pub url: String,
    sessions: mpsc::UnboundedReceiver<FeedSession>,
    handle: JoinHandle<()>,
}

impl FakeFeed {
    /// Bind a listener and accept WebSocket connections, capturing the
    /// first text frame of each as the subscribe request.
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, sessions) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _peer)) = listener.accept().await else {
                    return;
                };
                let tx = tx.clone();
                tokio::spawn(async move {
                    let Ok(mut socket) = accept_async(stream).await else {
                        return;
                    };
                    let subscribe = loop {
                        match socket.next().await {
                            Some(Ok(Message::Text(text))) => break text.to_string(),
                            Some(Ok(_)) => {}
                            _ => return,
                        }
                    };
                    let _ = tx.send(FeedSession { subscribe, socket });
                });
            }
        });

        Self {
            url: format!("ws://{addr}"),
            sessions,
            handle,
        }
    }

    /// Wait for the relay to dial in and subscribe.
    pub async fn next_session(&mut self) -> FeedSession {
        timeout(RECV_TIMEOUT, self.sessions.recv())
            .await
            .expect("timed out waiting for an upstream session")
            .expect("feed listener dropped")
    }

    /// Assert the relay never subscribed.
    pub fn assert_no_session(&mut self) {
        assert!(
            self.sessions.try_recv().is_err(),
            "relay opened an unexpected upstream session"
        );
    }
}

impl Drop for FakeFeed {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// =============================================================================
// Relay Harness
// =============================================================================

/// Relay server bound to an ephemeral port.
pub struct Relay {
    addr: SocketAddr,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Relay {
    /// Serve the relay router on an ephemeral loopback port.
    pub async fn spawn(config: &RelayConfig) -> Self {
        let cancel = CancellationToken::new();
        let state = Arc::new(RelayState::new(config, cancel.clone()));
        let app = router(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let serve_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(serve_cancel.cancelled_owned())
                .await
                .unwrap();
        });

        Self {
            addr,
            cancel,
            handle,
        }
    }

    /// Address of the HTTP listener.
    pub fn http_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Open a client connection to the relay's WebSocket endpoint.
    pub async fn connect(&self) -> ClientWs {
        let url = format!("ws://{}/ws", self.addr);
        let (socket, _response) = connect_async(url).await.unwrap();
        socket
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

/// Relay configuration pointing both feeds at the given upstream.
pub fn test_config(feed_url: &str) -> RelayConfig {
    RelayConfig {
        port: 0,
        endpoints: FeedEndpoints {
            fx_url: feed_url.to_string(),
            iex_url: feed_url.to_string(),
        },
        api_token: ApiToken::new("test-token"),
        shared_secret: Some("s3cr3t".to_string()),
        handshake_timeout: Some(Duration::from_secs(5)),
    }
}

// =============================================================================
// Socket Helpers
// =============================================================================

/// Send a text frame.
pub async fn send_text<S>(socket: &mut S, text: &str)
where
    S: SinkExt<Message> + Unpin,
    S::Error: std::fmt::Debug,
{
    socket.send(Message::Text(text.into())).await.unwrap();
}

/// Receive the next text frame, skipping pings and pongs.
pub async fn recv_text<S>(socket: &mut S) -> String
where
    S: StreamExt<Item = Result<Message, WsError>> + Unpin,
{
    loop {
        let message = timeout(RECV_TIMEOUT, socket.next())
            .await
            .expect("timed out waiting for a text frame")
            .expect("socket ended while waiting for a text frame")
            .expect("socket errored while waiting for a text frame");
        match message {
            Message::Text(text) => return text.to_string(),
            Message::Ping(_) | Message::Pong(_) => {}
            other => panic!("expected a text frame, got {other:?}"),
        }
    }
}

/// Receive the close frame, skipping anything before it.
///
/// Returns the close code and reason, or `None` when the leg ended
/// without a payloaded close frame.
pub async fn recv_close<S>(socket: &mut S) -> Option<(u16, String)>
where
    S: StreamExt<Item = Result<Message, WsError>> + Unpin,
{
    loop {
        let message = timeout(RECV_TIMEOUT, socket.next())
            .await
            .expect("timed out waiting for a close frame");
        match message {
            Some(Ok(Message::Close(frame))) => {
                return frame.map(|f| (u16::from(f.code), f.reason.to_string()));
            }
            Some(Ok(_)) => {}
            Some(Err(_)) | None => return None,
        }
    }
}

/// Issue a minimal HTTP/1.1 GET and return the raw response text.
pub async fn http_get(addr: SocketAddr, path: &str) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8(response).unwrap()
}
