//! Structured logging.
//!
//! `RUST_LOG` wins when set; otherwise the configured level applies to this crate
//! and HTTP request tracing.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set.
pub fn default_filter(log_level: &str) -> String {
    format!("taskgate={log_level},tower_http={log_level}")
}

/// Install the global subscriber. Call once, first thing in `main`.
pub fn init_logging(log_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(log_level).into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
