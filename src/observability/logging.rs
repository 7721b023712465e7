//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Take the filter from `RUST_LOG`, falling back to the configured level

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(level: &str) {
    let fallback = format!("catalog_http={level},catalog_fetch={level}");
    let result = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
