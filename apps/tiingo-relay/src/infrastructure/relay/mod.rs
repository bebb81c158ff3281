//! Relay Session Layer
//!
//! The per-client session driver and the control frames the relay
//! itself injects into the downstream stream.

pub mod messages;
pub mod session;

pub use messages::{INIT_OK_FRAME, UpstreamErrNotice};
pub use session::{RelaySession, SessionOutcome};
