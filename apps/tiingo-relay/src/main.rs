//! Tiingo Relay Binary
//!
//! Starts the WebSocket relay server.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin tiingo-relay
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `TIINGO_API_KEY`: Tiingo API token used for upstream subscriptions.
//!   The server starts without it, but refuses every subscription.
//!
//! ## Optional
//! - `PORT`: HTTP listen port (default: 8080)
//! - `RELAY_SECRET`: Shared secret clients must present (default: off)
//! - `RELAY_HANDSHAKE_TIMEOUT_SECS`: Handshake deadline, 0 disables (default: 30)
//! - `TIINGO_FX_URL`: FX feed override (default: wss://api.tiingo.com/fx)
//! - `TIINGO_IEX_URL`: IEX feed override (default: wss://api.tiingo.com/iex)
//! - `RUST_LOG`: Log filter (default: tiingo_relay=info)

use anyhow::Context;
use tiingo_relay::infrastructure::telemetry;
use tiingo_relay::{RelayConfig, RelayServer};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    load_dotenv();

    telemetry::init();

    tracing::info!("Starting Tiingo Relay");

    let config = RelayConfig::from_env().context("failed to load configuration")?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    let server = RelayServer::new(&config, shutdown_token.clone());

    tokio::spawn(await_shutdown(shutdown_token));

    server.run().await?;

    Ok(())
}

/// Log the parsed configuration.
fn log_config(config: &RelayConfig) {
    tracing::info!(
        port = config.port,
        token_configured = config.api_token.is_some(),
        secret_configured = config.shared_secret.is_some(),
        handshake_timeout_secs = config.handshake_timeout.map_or(0, |t| t.as_secs()),
        "Configuration loaded"
    );
    tracing::debug!(
        fx_url = %config.endpoints.fx_url,
        iex_url = %config.endpoints.iex_url,
        "Feed endpoints"
    );
}

/// Load .env from the current directory or the nearest ancestor holding one.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();
}
