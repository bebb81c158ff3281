//! Configuration Module
//!
//! Configuration loading for the relay service.

mod settings;

pub use settings::{
    ApiToken, ConfigError, DEFAULT_HANDSHAKE_TIMEOUT_SECS, DEFAULT_PORT, FeedEndpoints, RelayConfig,
};
