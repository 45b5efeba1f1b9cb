//! Logging and metrics setup for the `sqlhook` binary and tests.
//!
//! Provides:
//! - Structured logging via tracing-subscriber
//! - OpenTelemetry meter provider with optional OTLP export

pub mod metrics;
pub mod tracing;
