//! Tiingo Wire Format
//!
//! The subscribe request sent to Tiingo right after connecting. The
//! relay never authenticates separately; the token rides along in the
//! subscribe frame.
//!
//! # Wire Format (JSON)
//!
//! ```json
//! {
//!   "eventName": "subscribe",
//!   "authorization": "<api token>",
//!   "eventData": {"thresholdLevel": 5, "tickers": ["eurusd"]}
//! }
//! ```

use serde::Serialize;

use crate::domain::subscription::SubscriptionSpec;
use crate::infrastructure::config::ApiToken;

/// Subscribe request dispatched once per upstream connection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    event_name: &'static str,
    authorization: String,
    event_data: EventData,
}

/// Payload of the subscribe request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventData {
    threshold_level: u32,
    tickers: Vec<String>,
}

impl SubscribeRequest {
    /// Build the subscribe request for a coerced subscription.
    #[must_use]
    pub fn new(token: &ApiToken, spec: &SubscriptionSpec) -> Self {
        Self {
            event_name: "subscribe",
            authorization: token.reveal().to_string(),
            event_data: EventData {
                threshold_level: spec.threshold_level,
                tickers: spec.tickers.clone(),
            },
        }
    }

    /// Serialize the request to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (should not happen with
    /// valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
