//! Relay HTTP Server
//!
//! Single axum server carrying the service banner, the health probe,
//! and the `/ws` relay endpoint.
//!
//! # Endpoints
//!
//! - `GET /` - Service banner
//! - `GET /health` - Liveness probe (plain "ok")
//! - `GET /ws` - WebSocket upgrade into a relay session

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::domain::session::HandshakePolicy;
use crate::infrastructure::config::RelayConfig;
use crate::infrastructure::relay::RelaySession;
use crate::infrastructure::tiingo::TiingoConnector;

/// Banner served at the root path.
pub const SERVICE_BANNER: &str = "tiingo-relay";

/// Body served by the health probe.
pub const HEALTH_OK: &str = "ok";

// =============================================================================
// Relay State
// =============================================================================

/// Shared state handed to every relay session.
pub struct RelayState {
    policy: HandshakePolicy,
    connector: Option<TiingoConnector>,
    handshake_timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl RelayState {
    /// Build session state from the relay configuration.
    ///
    /// Without an API token no connector is built and the handshake
    /// policy refuses every subscription.
    #[must_use]
    pub fn new(config: &RelayConfig, cancel: CancellationToken) -> Self {
        let connector = config
            .api_token
            .clone()
            .map(|token| TiingoConnector::new(config.endpoints.clone(), token));

        Self {
            policy: config.handshake_policy(),
            connector,
            handshake_timeout: config.handshake_timeout,
            cancel,
        }
    }
}

/// Build the relay router.
#[must_use]
pub fn router(state: Arc<RelayState>) -> Router {
    Router::new()
        .route("/", get(banner_handler))
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn banner_handler() -> &'static str {
    SERVICE_BANNER
}

async fn health_handler() -> &'static str {
    HEALTH_OK
}

async fn ws_handler(
    State(state): State<Arc<RelayState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        let session = RelaySession::new(
            state.policy.clone(),
            state.connector.clone(),
            state.handshake_timeout,
            state.cancel.clone(),
        );
        session.run(socket)
    })
}

// =============================================================================
// Relay Server
// =============================================================================

/// Relay HTTP server.
pub struct RelayServer {
    port: u16,
    state: Arc<RelayState>,
    cancel: CancellationToken,
}

impl RelayServer {
    /// Create a server from the relay configuration.
    #[must_use]
    pub fn new(config: &RelayConfig, cancel: CancellationToken) -> Self {
        Self {
            port: config.port,
            state: Arc::new(RelayState::new(config, cancel.clone())),
            cancel,
        }
    }

    /// Run the server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), ServerError> {
        let app = router(self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "Relay listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| ServerError::ServeFailed(e.to_string()))?;

        tracing::info!("Relay stopped");
        Ok(())
    }
}

/// Relay server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServeFailed(String),
}

// =============================================================================
// Tests
// =============================================================================
