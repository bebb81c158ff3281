//! Tiingo Upstream Adapter
//!
//! WebSocket connector and wire format types for Tiingo's streaming API.

pub mod connector;
pub mod messages;

pub use connector::{TIINGO_ORIGIN, TiingoConnector, UpstreamError, UpstreamStream};
pub use messages::SubscribeRequest;
