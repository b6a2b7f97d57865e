/*!
 * Structured Tracing
 * Subscriber setup for the tracker binaries using the tracing crate
 */

use crate::core::config::TrackerConfig;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured tracing
///
/// Logs go to stderr so they never interleave with report tables on stdout.
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - MEMTRACK_TRACE_JSON: Enable JSON output (default: false)
pub fn init_tracing(config: &TrackerConfig) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if config.trace_json {
        // JSON output for production/parsing
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_current_span(true),
            )
            .try_init()
    } else {
        // Human-readable output for development
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        info!(json = config.trace_json, "Structured tracing initialized");
    }
}
