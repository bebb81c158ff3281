//! Relay Control Frames
//!
//! JSON frames the relay itself sends downstream, distinct from the
//! market data passed through verbatim. Clients tell them apart by the
//! `relay` member.
//!
//! # Wire Format (JSON)
//!
//! ```json
//! {"relay": "INIT_OK"}
//! {"relay": "UPSTREAM_ERR", "err": "connection failed: ..."}
//! ```

use serde::Serialize;

/// Acknowledgment sent once the upstream subscribe request is
/// dispatched. Nothing is acknowledged before that point.
pub const INIT_OK_FRAME: &str = r#"{"relay":"INIT_OK"}"#;

/// Notice sent downstream when the upstream leg fails.
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamErrNotice {
    relay: &'static str,
    err: String,
}

impl UpstreamErrNotice {
    /// Wrap an upstream failure for the client.
    #[must_use]
    pub fn new(err: impl std::fmt::Display) -> Self {
        Self {
            relay: "UPSTREAM_ERR",
            err: err.to_string(),
        }
    }

    /// Serialize the notice to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (should not happen with
    /// valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
