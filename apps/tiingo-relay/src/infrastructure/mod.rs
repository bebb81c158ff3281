//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer wires the domain rules to sockets: configuration from the
//! environment, the upstream Tiingo connector, the per-client session
//! driver, and the HTTP server exposing the WebSocket endpoint.

/// Configuration loaded from environment variables.
pub mod config;

/// Per-client relay sessions and relay control frames.
pub mod relay;

/// HTTP server with the WebSocket endpoint.
pub mod server;

/// Tracing setup.
pub mod telemetry;

/// Tiingo upstream WebSocket connector and wire types.
pub mod tiingo;
