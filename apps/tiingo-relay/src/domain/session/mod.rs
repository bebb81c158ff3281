//! Handshake State Machine
//!
//! Tracks a downstream client from its first frame to the forwarding
//! phase. The client must complete a two-frame handshake before any
//! upstream connection is attempted.
//!
//! # Handshake Flow
//!
//! 1. Connect to `/ws`
//! 2. Send `{"__secret": "..."}` - checked against the relay secret
//! 3. Send `{"kind": "iex", "tickers": [...], "thresholdLevel": 5}`
//! 4. Relay dials Tiingo, subscribes, and replies `{"relay": "INIT_OK"}`
//!
//! Any violation closes the socket with code 1008 and a terse reason.
//! The reason strings are part of the client-facing contract.

use thiserror::Error;

use super::subscription::SubscriptionSpec;

/// Close code sent on every handshake violation (policy violation).
pub const POLICY_VIOLATION: u16 = 1008;

// =============================================================================
// Protocol Violations
// =============================================================================

/// Client-caused handshake failures.
///
/// The `Display` text of each variant is the close reason sent to the
/// client, so the wording here is wire format, not just diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    /// First frame was not parseable JSON.
    #[error("bad auth")]
    BadAuth,

    /// First frame did not carry the expected shared secret.
    #[error("forbidden")]
    Forbidden,

    /// Second frame was not parseable JSON.
    #[error("bad json")]
    BadJson,

    /// Subscription unusable: no API token configured or no tickers.
    #[error("bad init")]
    BadInit,

    /// Handshake did not complete within the configured deadline.
    #[error("handshake timeout")]
    HandshakeTimeout,
}

// =============================================================================
// Session Phase
// =============================================================================

/// Lifecycle phase of one relay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Waiting for the secret frame.
    #[default]
    AwaitingAuth,

    /// Secret accepted, waiting for the subscription frame.
    AwaitingSubscription,

    /// Handshake complete, frames flow both ways.
    Forwarding,

    /// Session torn down.
    Closed,
}

impl SessionPhase {
    /// Check if the session reached the forwarding phase.
    #[must_use]
    pub const fn is_forwarding(&self) -> bool {
        matches!(self, Self::Forwarding)
    }

    /// Check if the session is closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

// =============================================================================
// Handshake Machine
// =============================================================================

/// What the relay enforces during the handshake.
#[derive(Debug, Clone, Default)]
pub struct HandshakePolicy {
    /// Secret the first frame must present. `None` disables the check.
    pub shared_secret: Option<String>,
    /// Whether an upstream API token is configured. Without one every
    /// subscription is refused.
    pub token_configured: bool,
}

/// Outcome of feeding one frame to the handshake machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeStep {
    /// Frame accepted, more frames expected.
    Pending,
    /// Handshake complete with the coerced subscription.
    Complete(SubscriptionSpec),
}

/// Drives the two-frame handshake.
///
/// Feed each inbound text frame to [`Handshake::on_frame`]. A violation
/// moves the machine to [`SessionPhase::Closed`] and the caller closes
/// the socket with [`POLICY_VIOLATION`] and the violation's `Display`
/// text as the reason.
#[derive(Debug)]
pub struct Handshake {
    phase: SessionPhase,
    policy: HandshakePolicy,
}

impl Handshake {
    /// Create a handshake machine for a fresh connection.
    #[must_use]
    pub const fn new(policy: HandshakePolicy) -> Self {
        Self {
            phase: SessionPhase::AwaitingAuth,
            policy,
        }
    }

    /// Get the current phase.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Process one frame from the client.
    ///
    /// Frames arriving after the handshake completed (or after a
    /// violation) are ignored and reported as [`HandshakeStep::Pending`].
    ///
    /// # Errors
    ///
    /// Returns the [`ProtocolViolation`] to close the socket with. The
    /// machine is [`SessionPhase::Closed`] afterwards.
    pub fn on_frame(&mut self, frame: &str) -> Result<HandshakeStep, ProtocolViolation> {
        match self.phase {
            SessionPhase::AwaitingAuth => self.on_auth_frame(frame),
            SessionPhase::AwaitingSubscription => self.on_subscription_frame(frame),
            SessionPhase::Forwarding | SessionPhase::Closed => Ok(HandshakeStep::Pending),
        }
    }

    /// Check the secret frame.
    ///
    /// With no secret configured any parseable JSON passes, scalars
    /// included. With one configured, the frame's `__secret` member
    /// must match it exactly.
    fn on_auth_frame(&mut self, frame: &str) -> Result<HandshakeStep, ProtocolViolation> {
        let Ok(value) = serde_json::from_str::<serde_json::Value>(frame) else {
            return Err(self.violate(ProtocolViolation::BadAuth));
        };

        if let Some(expected) = self.policy.shared_secret.as_deref()
            && value.get("__secret").and_then(serde_json::Value::as_str) != Some(expected)
        {
            return Err(self.violate(ProtocolViolation::Forbidden));
        }

        self.phase = SessionPhase::AwaitingSubscription;
        Ok(HandshakeStep::Pending)
    }

    /// Check the subscription frame and coerce it.
    fn on_subscription_frame(&mut self, frame: &str) -> Result<HandshakeStep, ProtocolViolation> {
        let Ok(value) = serde_json::from_str::<serde_json::Value>(frame) else {
            return Err(self.violate(ProtocolViolation::BadJson));
        };

        let spec = SubscriptionSpec::from_frame(&value);
        if !self.policy.token_configured || !spec.has_tickers() {
            return Err(self.violate(ProtocolViolation::BadInit));
        }

        self.phase = SessionPhase::Forwarding;
        Ok(HandshakeStep::Complete(spec))
    }

    fn violate(&mut self, violation: ProtocolViolation) -> ProtocolViolation {
        self.phase = SessionPhase::Closed;
        violation
    }
}
