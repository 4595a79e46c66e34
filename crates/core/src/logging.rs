//! Structured logging infrastructure for the agent trust core.
//!
//! This module provides centralized logging initialization with support
//! for structured JSON output and environment-based configuration.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system with structured output.
///
/// Log level can be configured via the `RUST_LOG` environment variable.
/// If not set, defaults to `info` level.
///
/// # Example
/// ```no_run
/// use agenttrust_core::logging;
///
/// logging::init();
/// tracing::info!("Application started");
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}

/// Initialize the logging system with JSON output for production environments.
///
/// This format is suitable for log aggregation systems and structured log analysis.
/// Log level can be configured via the `RUST_LOG` environment variable.
///
/// # Example
/// ```no_run
/// use agenttrust_core::logging;
///
/// logging::init_json();
/// tracing::info!(service = "gateway", "Service started");
/// ```
pub fn init_json() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_target(true).with_thread_ids(true))
        .init();
}
