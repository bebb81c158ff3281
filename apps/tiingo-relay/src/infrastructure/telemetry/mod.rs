//! Tracing Setup
//!
//! Structured logging via `tracing` with an env-filter formatter.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log filter (default: `tiingo_relay=info`)

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter applied when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "tiingo_relay=info";

/// Initialize the tracing subscriber.
///
/// Call once at startup, before the first log line.
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
