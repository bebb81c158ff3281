//! Relay Configuration Settings
//!
//! Configuration types for the relay, loaded from environment variables.
//! Nothing here is required at startup: without an API token the server
//! still serves HTTP, it just refuses every subscription.

use std::time::Duration;

use crate::domain::session::HandshakePolicy;
use crate::domain::subscription::FeedKind;

/// Default HTTP listen port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default handshake deadline in seconds. Zero disables the deadline.
pub const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 30;

/// Production FX feed endpoint.
const DEFAULT_FX_URL: &str = "wss://api.tiingo.com/fx";

/// Production IEX feed endpoint.
const DEFAULT_IEX_URL: &str = "wss://api.tiingo.com/iex";

// =============================================================================
// API Token
// =============================================================================

/// Tiingo API token used to authorize upstream subscriptions.
///
/// The `Debug` implementation redacts the token for safe logging.
#[derive(Clone)]
pub struct ApiToken(String);

impl ApiToken {
    /// Create a token, treating an empty string as absent.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.is_empty() { None } else { Some(Self(token)) }
    }

    /// Get the raw token for the subscribe request.
    #[must_use]
    pub fn reveal(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ApiToken").field(&"[REDACTED]").finish()
    }
}

// =============================================================================
// Feed Endpoints
// =============================================================================

/// WebSocket endpoints for the Tiingo feeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEndpoints {
    /// FX feed URL.
    pub fx_url: String,
    /// IEX feed URL.
    pub iex_url: String,
}

impl Default for FeedEndpoints {
    fn default() -> Self {
        Self {
            fx_url: DEFAULT_FX_URL.to_string(),
            iex_url: DEFAULT_IEX_URL.to_string(),
        }
    }
}

impl FeedEndpoints {
    /// Get the endpoint for a feed kind.
    #[must_use]
    pub fn url_for(&self, kind: FeedKind) -> &str {
        match kind {
            FeedKind::Fx => &self.fx_url,
            FeedKind::Iex => &self.iex_url,
        }
    }
}

// =============================================================================
// Relay Configuration
// =============================================================================

/// Complete relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// HTTP listen port.
    pub port: u16,
    /// Upstream feed endpoints.
    pub endpoints: FeedEndpoints,
    /// Tiingo API token. `None` means every subscription is refused.
    pub api_token: Option<ApiToken>,
    /// Shared secret clients must present. `None` disables the check.
    pub shared_secret: Option<String>,
    /// Handshake deadline. `None` disables the deadline.
    pub handshake_timeout: Option<Duration>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            endpoints: FeedEndpoints::default(),
            api_token: None,
            shared_secret: None,
            handshake_timeout: Some(Duration::from_secs(DEFAULT_HANDSHAKE_TIMEOUT_SECS)),
        }
    }
}

impl RelayConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a present variable fails to parse. Missing
    /// variables fall back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = parse_env("PORT", DEFAULT_PORT)?;

        let api_token = std::env::var("TIINGO_API_KEY").ok().and_then(ApiToken::new);

        let shared_secret = std::env::var("RELAY_SECRET").ok().filter(|s| !s.is_empty());

        let endpoints = FeedEndpoints {
            fx_url: std::env::var("TIINGO_FX_URL").unwrap_or_else(|_| DEFAULT_FX_URL.to_string()),
            iex_url: std::env::var("TIINGO_IEX_URL")
                .unwrap_or_else(|_| DEFAULT_IEX_URL.to_string()),
        };

        let timeout_secs = parse_env(
            "RELAY_HANDSHAKE_TIMEOUT_SECS",
            DEFAULT_HANDSHAKE_TIMEOUT_SECS,
        )?;
        let handshake_timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));

        Ok(Self {
            port,
            endpoints,
            api_token,
            shared_secret,
            handshake_timeout,
        })
    }

    /// Derive the handshake policy enforced on downstream clients.
    #[must_use]
    pub fn handshake_policy(&self) -> HandshakePolicy {
        HandshakePolicy {
            shared_secret: self.shared_secret.clone(),
            token_configured: self.api_token.is_some(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable is present but does not parse.
    #[error("environment variable {key} has invalid value: {value}")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Offending value.
        value: String,
    },
}

fn parse_env<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    let Ok(raw) = std::env::var(key) else {
        return Ok(default);
    };

    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value: raw })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_token_rejects_empty() {
        assert!(ApiToken::new("").is_none());
        assert!(ApiToken::new("tok").is_some());
    }

    #[test]
    fn api_token_redacted_debug() {
        let token = ApiToken::new("super-secret-token").unwrap();
        let debug = format!("{token:?}");
        assert!(!debug.contains("super-secret-token"));
        assert!(debug.contains("[REDACTED]"));
        assert_eq!(token.reveal(), "super-secret-token");
    }

    #[test]
    fn endpoints_default_to_production() {
        let endpoints = FeedEndpoints::default();
        assert_eq!(endpoints.fx_url, "wss://api.tiingo.com/fx");
        assert_eq!(endpoints.iex_url, "wss://api.tiingo.com/iex");
    }

    #[test]
    fn url_for_matches_kind() {
        let endpoints = FeedEndpoints {
            fx_url: "ws://localhost:1/fx".to_string(),
            iex_url: "ws://localhost:2/iex".to_string(),
        };
        assert_eq!(endpoints.url_for(FeedKind::Fx), "ws://localhost:1/fx");
        assert_eq!(endpoints.url_for(FeedKind::Iex), "ws://localhost:2/iex");
    }

    #[test]
    fn config_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.api_token.is_none());
        assert!(config.shared_secret.is_none());
        assert_eq!(
            config.handshake_timeout,
            Some(Duration::from_secs(DEFAULT_HANDSHAKE_TIMEOUT_SECS))
        );
    }

    #[test]
    fn policy_reflects_token_and_secret() {
        let config = RelayConfig {
            api_token: ApiToken::new("tok"),
            shared_secret: Some("hunter2".to_string()),
            ..RelayConfig::default()
        };
        let policy = config.handshake_policy();
        assert!(policy.token_configured);
        assert_eq!(policy.shared_secret.as_deref(), Some("hunter2"));

        let policy = RelayConfig::default().handshake_policy();
        assert!(!policy.token_configured);
        assert!(policy.shared_secret.is_none());
    }
}
