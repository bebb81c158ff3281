//! Relay Session
//!
//! Drives one downstream client from WebSocket upgrade to teardown:
//! the two-frame handshake, the upstream dial, and the bidirectional
//! forwarding loop. One session owns exactly one upstream connection,
//! and only after the handshake completed; there is no upstream handle
//! to juggle before that point.
//!
//! # Lifecycle
//!
//! - Handshake violations close the client with code 1008 and the
//!   violation text as the reason.
//! - Upstream failures are reported as an `UPSTREAM_ERR` notice, then
//!   the client is closed without a policy code.
//! - Once forwarding, either leg closing closes the other. An upstream
//!   close frame is mirrored to the client verbatim; a client close is
//!   not announced upstream.

use std::time::{Duration, Instant};

use axum::extract::ws::{CloseFrame, Message as ClientMessage, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::messages::{INIT_OK_FRAME, UpstreamErrNotice};
use crate::domain::session::{
    Handshake, HandshakePolicy, HandshakeStep, POLICY_VIOLATION, ProtocolViolation,
};
use crate::domain::subscription::SubscriptionSpec;
use crate::infrastructure::tiingo::{TiingoConnector, UpstreamError, UpstreamStream};

// =============================================================================
// Session Outcome
// =============================================================================

/// How a forwarding session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Downstream client closed or dropped its leg.
    ClientClosed,
    /// Upstream feed closed its leg.
    UpstreamClosed,
    /// Upstream transport error.
    UpstreamFailed,
    /// Relay shutdown cancelled the session.
    Cancelled,
}

impl SessionOutcome {
    /// Get the outcome name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ClientClosed => "client closed",
            Self::UpstreamClosed => "upstream closed",
            Self::UpstreamFailed => "upstream failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters reported when a forwarding session ends.
struct ForwardSummary {
    outcome: SessionOutcome,
    frames_up: u64,
    frames_down: u64,
}

/// Why the handshake did not reach forwarding.
enum HandshakeFailure {
    /// Client broke the protocol; close with 1008 and a reason.
    Violation(ProtocolViolation),
    /// Upstream leg failed; notify the client, no policy code.
    Upstream(UpstreamError),
    /// Client closed or dropped before completing.
    ClientGone,
    /// Relay shutdown.
    Cancelled,
}

impl From<ProtocolViolation> for HandshakeFailure {
    fn from(violation: ProtocolViolation) -> Self {
        Self::Violation(violation)
    }
}

// =============================================================================
// Relay Session
// =============================================================================

/// One downstream client's relay session.
pub struct RelaySession {
    id: Uuid,
    policy: HandshakePolicy,
    connector: Option<TiingoConnector>,
    handshake_timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl RelaySession {
    /// Create a session for a freshly upgraded socket.
    #[must_use]
    pub fn new(
        policy: HandshakePolicy,
        connector: Option<TiingoConnector>,
        handshake_timeout: Option<Duration>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            policy,
            connector,
            handshake_timeout,
            cancel,
        }
    }

    /// Drive the session to completion.
    ///
    /// Consumes the session and the socket; all failure modes end in a
    /// closed socket, so there is nothing for the caller to handle.
    pub async fn run(self, mut client: WebSocket) {
        let started = Instant::now();

        let established = match self.handshake_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.establish(&mut client)).await {
                Ok(result) => result,
                Err(_) => Err(HandshakeFailure::Violation(
                    ProtocolViolation::HandshakeTimeout,
                )),
            },
            None => self.establish(&mut client).await,
        };

        let (spec, mut upstream) = match established {
            Ok(pair) => pair,
            Err(failure) => {
                self.reject(&mut client, failure).await;
                return;
            }
        };

        tracing::info!(
            session = %self.id,
            kind = %spec.kind,
            tickers = spec.tickers.len(),
            threshold_level = spec.threshold_level,
            "Session established"
        );

        let summary = self.forward(&mut client, &mut upstream).await;

        tracing::info!(
            session = %self.id,
            duration_ms = started.elapsed().as_millis(),
            frames_up = summary.frames_up,
            frames_down = summary.frames_down,
            outcome = %summary.outcome,
            "Session closed"
        );
    }

    /// Run the handshake and dial upstream.
    ///
    /// Binary frames are tolerated during the handshake; their bytes
    /// are decoded lossily and fed to the machine like text.
    async fn establish(
        &self,
        client: &mut WebSocket,
    ) -> Result<(SubscriptionSpec, UpstreamStream), HandshakeFailure> {
        let mut handshake = Handshake::new(self.policy.clone());

        let spec = loop {
            let message = tokio::select! {
                () = self.cancel.cancelled() => return Err(HandshakeFailure::Cancelled),
                message = client.recv() => message,
            };

            let step = match message {
                Some(Ok(ClientMessage::Text(text))) => handshake.on_frame(text.as_str())?,
                Some(Ok(ClientMessage::Binary(bytes))) => {
                    handshake.on_frame(&String::from_utf8_lossy(&bytes))?
                }
                Some(Ok(ClientMessage::Ping(_) | ClientMessage::Pong(_))) => continue,
                Some(Ok(ClientMessage::Close(_))) | Some(Err(_)) | None => {
                    return Err(HandshakeFailure::ClientGone);
                }
            };

            if let HandshakeStep::Complete(spec) = step {
                break spec;
            }
        };

        // Policy already refused the subscription if no token is set,
        // so a missing connector here is the same violation.
        let connector = self.connector.as_ref().ok_or(ProtocolViolation::BadInit)?;

        let mut upstream = connector
            .connect(&spec)
            .await
            .map_err(HandshakeFailure::Upstream)?;

        if client
            .send(ClientMessage::Text(INIT_OK_FRAME.into()))
            .await
            .is_err()
        {
            let _ = upstream.close(None).await;
            return Err(HandshakeFailure::ClientGone);
        }

        Ok((spec, upstream))
    }

    /// Tear down a session that never reached forwarding.
    async fn reject(&self, client: &mut WebSocket, failure: HandshakeFailure) {
        match failure {
            HandshakeFailure::Violation(violation) => {
                tracing::debug!(session = %self.id, reason = %violation, "Handshake rejected");
                let close = CloseFrame {
                    code: POLICY_VIOLATION,
                    reason: violation.to_string().into(),
                };
                let _ = client.send(ClientMessage::Close(Some(close))).await;
            }
            HandshakeFailure::Upstream(error) => {
                tracing::warn!(session = %self.id, error = %error, "Upstream connection failed");
                if let Ok(notice) = UpstreamErrNotice::new(&error).to_json() {
                    let _ = client.send(ClientMessage::Text(notice.into())).await;
                }
                let _ = client.send(ClientMessage::Close(None)).await;
            }
            HandshakeFailure::ClientGone => {
                tracing::debug!(session = %self.id, "Client left during handshake");
            }
            HandshakeFailure::Cancelled => {
                let _ = client.send(ClientMessage::Close(None)).await;
            }
        }
    }

    /// Pump frames between the two legs until either closes.
    ///
    /// Client-to-upstream delivery is best effort: a failed send is
    /// dropped without tearing the session down. Upstream-to-client
    /// delivery failing means the client is gone, which ends the
    /// session.
    async fn forward(
        &self,
        client: &mut WebSocket,
        upstream: &mut UpstreamStream,
    ) -> ForwardSummary {
        let mut frames_up: u64 = 0;
        let mut frames_down: u64 = 0;

        let outcome = loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    let _ = client.send(ClientMessage::Close(None)).await;
                    let _ = upstream.close(None).await;
                    break SessionOutcome::Cancelled;
                }
                message = client.recv() => match message {
                    Some(Ok(ClientMessage::Text(text))) => {
                        frames_up += 1;
                        let _ = upstream.send(UpstreamMessage::Text(text.as_str().into())).await;
                    }
                    Some(Ok(ClientMessage::Binary(bytes))) => {
                        frames_up += 1;
                        let _ = upstream.send(UpstreamMessage::Binary(bytes)).await;
                    }
                    Some(Ok(ClientMessage::Ping(_) | ClientMessage::Pong(_))) => {}
                    Some(Ok(ClientMessage::Close(_))) | Some(Err(_)) | None => {
                        let _ = upstream.close(None).await;
                        break SessionOutcome::ClientClosed;
                    }
                },
                message = upstream.next() => match message {
                    Some(Ok(UpstreamMessage::Text(text))) => {
                        frames_down += 1;
                        if client.send(ClientMessage::Text(text.as_str().into())).await.is_err() {
                            let _ = upstream.close(None).await;
                            break SessionOutcome::ClientClosed;
                        }
                    }
                    Some(Ok(UpstreamMessage::Binary(bytes))) => {
                        frames_down += 1;
                        let text = String::from_utf8_lossy(&bytes).into_owned();
                        if client.send(ClientMessage::Text(text.into())).await.is_err() {
                            let _ = upstream.close(None).await;
                            break SessionOutcome::ClientClosed;
                        }
                    }
                    Some(Ok(UpstreamMessage::Ping(payload))) => {
                        let _ = upstream.send(UpstreamMessage::Pong(payload)).await;
                    }
                    Some(Ok(UpstreamMessage::Pong(_) | UpstreamMessage::Frame(_))) => {}
                    Some(Ok(UpstreamMessage::Close(frame))) => {
                        let mirrored = frame.map(|frame| CloseFrame {
                            code: frame.code.into(),
                            reason: frame.reason.as_str().into(),
                        });
                        let _ = client.send(ClientMessage::Close(mirrored)).await;
                        break SessionOutcome::UpstreamClosed;
                    }
                    Some(Err(error)) => {
                        tracing::warn!(session = %self.id, error = %error, "Upstream transport error");
                        if let Ok(notice) = UpstreamErrNotice::new(&error).to_json() {
                            let _ = client.send(ClientMessage::Text(notice.into())).await;
                        }
                        let _ = client.send(ClientMessage::Close(None)).await;
                        break SessionOutcome::UpstreamFailed;
                    }
                    None => {
                        let _ = client.send(ClientMessage::Close(None)).await;
                        break SessionOutcome::UpstreamClosed;
                    }
                },
            }
        };

        ForwardSummary {
            outcome,
            frames_up,
            frames_down,
        }
    }
}
