//! sqlhook: context-aware event reporting for database access layers.
//!
//! A database layer reports what it does (events, errors, timings) to an
//! [`EventReporter`](reporter::EventReporter). Callers that do not care use
//! the shared [`NullEventReporter`](reporter::NullEventReporter); the others
//! plug in a tracing or OpenTelemetry receiver, or their own.
//!
//! # Modules
//!
//! - [`config`]: CLI and environment configuration for the binary
//! - [`context`]: Cancellation, deadline and request-value propagation
//! - [`observability`]: Tracing and metrics setup
//! - [`reporter`]: The reporting contract and its receivers
//! - [`session`]: Instrumented SQLite access

// Lint configuration
#![warn(clippy::all)]
#![allow(
    clippy::module_name_repetitions, // reporter::log::LogReporter is fine
    clippy::must_use_candidate,      // Not all functions need #[must_use]
    clippy::missing_errors_doc,      // Error docs can be verbose
    clippy::missing_panics_doc,      // Panic docs can be verbose
    clippy::cast_precision_loss      // Nanoseconds to f64 seconds
)]

pub mod config;
pub mod context;
pub mod observability;
pub mod reporter;
pub mod session;
