//! sqlhook: run SQL against SQLite with instrumented event reporting.
//!
//! # Usage
//!
//! ```bash
//! sqlhook --database ./app.db --reporter log \
//!     "CREATE TABLE IF NOT EXISTS t (v INTEGER)" \
//!     "INSERT INTO t VALUES (1)" \
//!     --query "SELECT * FROM t"
//! ```
//!
//! Environment variables can also be used:
//! - `SQLHOOK_DATABASE`: SQLite database file
//! - `SQLHOOK_REPORTER`: null, log or metrics
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)
//!
//! Ctrl+C or `--timeout-ms` cancels the run and interrupts the statement
//! that is executing.

use std::sync::Arc;

use sqlhook::config::{Config, ReporterKind};
use sqlhook::context::Context;
use sqlhook::observability::metrics::{init_metrics_with_endpoint, shutdown_metrics};
use sqlhook::observability::tracing::init_tracing;
use sqlhook::reporter::{shared_null_reporter, LogReporter, MetricsReporter, SharedReporter};
use sqlhook::session::Connection;

fn build_reporter(config: &Config) -> SharedReporter {
    match config.reporter {
        ReporterKind::Null => shared_null_reporter(),
        ReporterKind::Log => Arc::new(LogReporter::new(tracing::Level::INFO)),
        ReporterKind::Metrics => {
            init_metrics_with_endpoint(config.otel_endpoint.as_deref());
            Arc::new(MetricsReporter::global())
        }
    }
}

async fn run(config: Config, ctx: Context, reporter: SharedReporter) -> anyhow::Result<()> {
    let connection = Connection::open(&config.database, config.pool_size, Some(reporter))?;
    let session = connection.new_session(None);
    tracing::info!(
        database = %config.database.display(),
        reporter = ?config.reporter,
        "Session opened"
    );

    // SQLite calls block; keep them off the runtime threads
    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        for statement in &config.statements {
            let changed = session.exec(&ctx, statement, [])?;
            println!("{changed} row(s) changed");
        }
        for query in &config.queries {
            for row in session.query_rows(&ctx, query)? {
                println!("{}", row.join("\t"));
            }
        }
        Ok(())
    })
    .await?
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse configuration from CLI arguments and environment
    let config = Config::parse_args();

    // Initialize tracing/logging
    init_tracing(&config.log_level);

    let root = Context::background();
    let ctx = match config.timeout() {
        Some(timeout) => root.with_timeout(timeout),
        None => root.with_cancel(),
    };

    // Cancel the run on Ctrl+C
    let signal_ctx = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C, cancelling");
            signal_ctx.cancel();
        }
    });

    let reporter = build_reporter(&config);
    let result = run(config, ctx, reporter).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "Run failed");
    }

    // Push buffered metrics whether or not the run succeeded
    tokio::task::spawn_blocking(shutdown_metrics).await?;
    result
}
