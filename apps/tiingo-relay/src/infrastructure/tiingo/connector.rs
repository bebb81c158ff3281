//! Tiingo WebSocket Connector
//!
//! Dials the Tiingo feed matching a subscription and dispatches the
//! subscribe request. Tiingo checks the `Origin` header on upgrade, so
//! the connector always presents the production origin.

use futures_util::SinkExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::http::Uri;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::messages::SubscribeRequest;
use crate::domain::subscription::SubscriptionSpec;
use crate::infrastructure::config::{ApiToken, FeedEndpoints};

/// Origin header value Tiingo expects on WebSocket upgrades.
pub const TIINGO_ORIGIN: &str = "https://api.tiingo.com";

/// Upstream connection, TLS or plain depending on the endpoint scheme.
pub type UpstreamStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Errors on the upstream leg.
///
/// These are reported to the client as an `UPSTREAM_ERR` notice, never
/// as a policy violation. The client did nothing wrong.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// Configured feed URL does not parse.
    #[error("invalid feed url: {0}")]
    InvalidUrl(String),

    /// WebSocket connection failed.
    #[error("connection failed: {0}")]
    Connect(#[source] tungstenite::Error),

    /// Subscribe request could not be encoded.
    #[error("subscribe encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// Subscribe request could not be sent.
    #[error("subscribe send failed: {0}")]
    Subscribe(#[source] tungstenite::Error),
}

/// Connector for Tiingo's streaming feeds.
#[derive(Debug, Clone)]
pub struct TiingoConnector {
    endpoints: FeedEndpoints,
    token: ApiToken,
}

impl TiingoConnector {
    /// Create a connector.
    #[must_use]
    pub const fn new(endpoints: FeedEndpoints, token: ApiToken) -> Self {
        Self { endpoints, token }
    }

    /// Connect to the feed matching the subscription and dispatch the
    /// subscribe request.
    ///
    /// The returned stream has the subscription in flight; the first
    /// inbound frames are Tiingo's own acknowledgments.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamError` if the URL is invalid, the connection
    /// fails, or the subscribe request cannot be delivered.
    pub async fn connect(&self, spec: &SubscriptionSpec) -> Result<UpstreamStream, UpstreamError> {
        let url = self.endpoints.url_for(spec.kind);
        let uri: Uri = url
            .parse()
            .map_err(|_| UpstreamError::InvalidUrl(url.to_string()))?;
        let request = ClientRequestBuilder::new(uri).with_header("Origin", TIINGO_ORIGIN);

        tracing::debug!(url, kind = %spec.kind, "Connecting to upstream feed");
        let (mut stream, _response) = connect_async(request)
            .await
            .map_err(UpstreamError::Connect)?;

        let subscribe = SubscribeRequest::new(&self.token, spec).to_json()?;
        stream
            .send(Message::Text(subscribe.into()))
            .await
            .map_err(UpstreamError::Subscribe)?;

        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::subscription::FeedKind;

    fn spec() -> SubscriptionSpec {
        SubscriptionSpec {
            kind: FeedKind::Fx,
            tickers: vec!["eurusd".to_string()],
            threshold_level: 5,
        }
    }

    #[tokio::test]
    async fn invalid_url_fails_before_dialing() {
        let endpoints = FeedEndpoints {
            fx_url: "not a url".to_string(),
            iex_url: "also not".to_string(),
        };
        let connector = TiingoConnector::new(endpoints, ApiToken::new("t").unwrap());

        let err = connector.connect(&spec()).await.unwrap_err();
        assert!(matches!(err, UpstreamError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn refused_connection_is_a_connect_error() {
        // Port 1 is never listening on loopback.
        let endpoints = FeedEndpoints {
            fx_url: "ws://127.0.0.1:1".to_string(),
            iex_url: "ws://127.0.0.1:1".to_string(),
        };
        let connector = TiingoConnector::new(endpoints, ApiToken::new("t").unwrap());

        let err = connector.connect(&spec()).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Connect(_)));
    }
}
