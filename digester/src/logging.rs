//! Diagnostic tracing for the digest agent.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: progress and diagnostics via `RUST_LOG`,
//!   output to stderr. Not persisted.
//!
//! - **Run logs (`io/run_log`)**: product artifacts in the logs directory.
//!   Always written, unaffected by `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "digester=info,warn";

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `digester=info,warn` if unset.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=digester=debug digester run
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
