//! Subscription Coercion
//!
//! Turns the client's subscription frame into a well-formed request for
//! Tiingo. Clients are untrusted, so every field is coerced rather than
//! validated: an unknown feed kind falls back to FX, non-string tickers
//! are dropped, and a malformed threshold falls back to the default.

use serde_json::Value;

/// Threshold level applied when the client omits one or sends junk.
pub const DEFAULT_THRESHOLD_LEVEL: u32 = 5;

// =============================================================================
// Feed Kind
// =============================================================================

/// Tiingo feed selected by the subscription frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedKind {
    /// Forex feed. Default for anything that is not exactly "iex".
    #[default]
    Fx,
    /// IEX equities feed.
    Iex,
}

impl FeedKind {
    /// Resolve the feed from the frame's `kind` field.
    ///
    /// Only the exact string `"iex"` selects the IEX feed. Everything
    /// else, including a missing or non-string field, means FX.
    #[must_use]
    pub fn from_frame_value(value: Option<&str>) -> Self {
        match value {
            Some("iex") => Self::Iex,
            _ => Self::Fx,
        }
    }

    /// Get the feed name used in URLs and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fx => "fx",
            Self::Iex => "iex",
        }
    }
}

impl std::fmt::Display for FeedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Subscription Spec
// =============================================================================

/// Coerced subscription extracted from the client's second frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionSpec {
    /// Feed the client wants to follow.
    pub kind: FeedKind,
    /// Tickers, lower-cased with the client's ordering preserved.
    pub tickers: Vec<String>,
    /// Update threshold forwarded to Tiingo.
    pub threshold_level: u32,
}

impl SubscriptionSpec {
    /// Coerce a parsed subscription frame.
    ///
    /// Accepts any JSON value. A non-array `tickers` field yields an
    /// empty list, which the handshake rejects separately.
    #[must_use]
    pub fn from_frame(frame: &Value) -> Self {
        let kind = FeedKind::from_frame_value(frame.get("kind").and_then(Value::as_str));

        let tickers = frame
            .get("tickers")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_lowercase)
                    .collect()
            })
            .unwrap_or_default();

        let threshold_level =
            coerce_threshold(frame.get("thresholdLevel")).unwrap_or(DEFAULT_THRESHOLD_LEVEL);

        Self {
            kind,
            tickers,
            threshold_level,
        }
    }

    /// Check whether the subscription names at least one ticker.
    #[must_use]
    pub const fn has_tickers(&self) -> bool {
        !self.tickers.is_empty()
    }
}

/// Coerce the `thresholdLevel` field to a positive whole number.
///
/// Accepts a positive integer or a decimal string of one. Zero,
/// negatives, fractions, and anything non-numeric are rejected so the
/// caller falls back to [`DEFAULT_THRESHOLD_LEVEL`].
fn coerce_threshold(value: Option<&Value>) -> Option<u32> {
    let level = match value? {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };

    if level == 0 {
        return None;
    }

    u32::try_from(level).ok()
}
