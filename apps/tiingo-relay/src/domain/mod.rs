//! Domain Layer - Handshake and subscription logic.
//!
//! This layer contains the relay's protocol rules with no I/O. The
//! handshake machine and the subscription coercions are pure functions
//! over JSON values, so every rule is testable without a socket.

/// Handshake state machine and protocol violations.
pub mod session;

/// Feed selection and subscription coercion.
pub mod subscription;
