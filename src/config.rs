//! Configuration parsing for the `sqlhook` binary.
//!
//! Supports:
//! - CLI arguments via clap
//! - Environment variable overrides
//! - Sensible defaults for quick start

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Which receiver the session reports to.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterKind {
    /// Discard every event
    Null,
    /// Write events through tracing
    Log,
    /// Record events as OpenTelemetry metrics
    Metrics,
}

/// sqlhook: run SQL against SQLite with instrumented event reporting.
#[derive(Parser, Debug, Clone)]
#[command(name = "sqlhook")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// SQLite database file
    #[arg(short, long, env = "SQLHOOK_DATABASE", default_value = "./sqlhook.db")]
    pub database: PathBuf,

    /// Size of the connection pool (at least 1)
    #[arg(
        long,
        env = "SQLHOOK_POOL_SIZE",
        default_value_t = 4,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub pool_size: u32,

    /// Receiver for session events
    #[arg(short, long, env = "SQLHOOK_REPORTER", value_enum, default_value_t = ReporterKind::Log)]
    pub reporter: ReporterKind,

    /// Log filter directive (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Deadline for the whole run, in milliseconds
    #[arg(long, env = "SQLHOOK_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Query whose rows are printed (repeatable, runs after statements)
    #[arg(short, long = "query", value_name = "SQL")]
    pub queries: Vec<String>,

    /// OpenTelemetry collector endpoint for metrics export (optional)
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otel_endpoint: Option<String>,

    /// Statements to execute, in order
    #[arg(value_name = "STATEMENT")]
    pub statements: Vec<String>,
}

impl Config {
    /// Parse configuration from CLI arguments and environment.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Create a default configuration for testing.
    #[cfg(test)]
    pub fn test_config(database: PathBuf) -> Self {
        Self {
            database,
            pool_size: 1,
            reporter: ReporterKind::Null,
            log_level: "debug".into(),
            timeout_ms: Some(1_000),
            queries: Vec::new(),
            otel_endpoint: None,
            statements: Vec::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("./sqlhook.db"),
            pool_size: 4,
            reporter: ReporterKind::Log,
            log_level: "info".into(),
            timeout_ms: None,
            queries: Vec::new(),
            otel_endpoint: None,
            statements: Vec::new(),
        }
    }
}
