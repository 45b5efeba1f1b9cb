//! Tracing subscriber setup.
//!
//! Configures structured logging with:
//! - `RUST_LOG` environment filter, falling back to the configured directive
//! - fmt layer with target, thread ids, file and line

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing.
///
/// `RUST_LOG` wins when set; otherwise `default_directive` (e.g. `info` or
/// `info,sqlhook::events=debug`) is used. An unparsable directive falls back
/// to `info`.
///
/// # Panics
///
/// Panics if tracing has already been initialized.
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Tracing initialized");
}

/// Initialize tracing for tests (only logs errors).
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("error")
        .with_test_writer()
        .try_init();
}
