#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::too_many_lines,
        clippy::needless_pass_by_value
    )
)]

//! Tiingo Relay - WebSocket Feed Relay
//!
//! A single-hop relay between untrusted downstream WebSocket clients
//! and Tiingo's streaming feeds. Each client completes a two-frame
//! handshake (shared secret, then subscription), after which the relay
//! dials the matching Tiingo feed, subscribes with the server-held API
//! token, and forwards frames in both directions until either leg
//! closes. Clients never see the API token.
//!
//! # Layers (inside to outside)
//!
//! - **Domain**: Protocol rules with no I/O
//!   - `session`: Handshake state machine and close policy
//!   - `subscription`: Feed selection and subscription coercion
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `config`: Environment-driven configuration
//!   - `tiingo`: Upstream WebSocket connector and subscribe wire format
//!   - `relay`: Per-client session driver and relay control frames
//!   - `server`: HTTP server with the `/ws` endpoint
//!   - `telemetry`: Tracing setup
//!
//! # Data Flow
//!
//! ```text
//! Client WS ---> /ws ---> handshake ---> subscribe ---> Tiingo feed WS
//!     ^                                                       |
//!     +------------------- forwarding <-----------------------+
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Handshake and subscription rules with no I/O.
pub mod domain;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::session::{
    Handshake, HandshakePolicy, HandshakeStep, POLICY_VIOLATION, ProtocolViolation, SessionPhase,
};
pub use domain::subscription::{DEFAULT_THRESHOLD_LEVEL, FeedKind, SubscriptionSpec};

// Infrastructure config
pub use infrastructure::config::{ApiToken, ConfigError, FeedEndpoints, RelayConfig};

// Relay session and control frames
pub use infrastructure::relay::{INIT_OK_FRAME, RelaySession, SessionOutcome, UpstreamErrNotice};

// Relay server (for integration tests)
pub use infrastructure::server::{
    HEALTH_OK, RelayServer, RelayState, SERVICE_BANNER, ServerError, router,
};

// Tiingo connector
pub use infrastructure::tiingo::{
    SubscribeRequest, TIINGO_ORIGIN, TiingoConnector, UpstreamError, UpstreamStream,
};
