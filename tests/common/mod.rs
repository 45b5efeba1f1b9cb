//! Test utilities shared by the integration tests.
//!
//! Provides:
//! - Temporary database fixtures
//! - A reporter that records every call

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use sqlhook::context::Context;
use sqlhook::reporter::{EventReporter, Kvs, SharedReporter};
use sqlhook::session::pool::PoolOptions;
use sqlhook::session::Connection;
use tempfile::TempDir;

/// Test fixture that manages a temporary database directory.
///
/// The directory is automatically cleaned up when the fixture is dropped.
pub struct TestFixture {
    /// Temporary directory for test database
    pub temp_dir: TempDir,
    /// Path to the database file
    pub db_path: PathBuf,
}

impl TestFixture {
    /// Create a new test fixture with a temporary database directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        Self { temp_dir, db_path }
    }

    /// Open a pooled connection reporting to `reporter`.
    pub fn connect(&self, reporter: SharedReporter) -> Connection {
        Connection::open(&self.db_path, 4, Some(reporter)).expect("failed to open database")
    }

    /// Open a pooled connection with explicit pool options.
    pub fn connect_with(&self, reporter: SharedReporter, options: PoolOptions) -> Connection {
        Connection::open_with(&self.db_path, options, Some(reporter))
            .expect("failed to open database")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// One call received by [`RecordingReporter`].
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Event { name: String, kvs: Kvs },
    Error { name: String, message: String, kvs: Kvs },
    Timing { name: String, nanoseconds: i64, kvs: Kvs },
}

impl Recorded {
    pub fn name(&self) -> &str {
        match self {
            Recorded::Event { name, .. }
            | Recorded::Error { name, .. }
            | Recorded::Timing { name, .. } => name,
        }
    }
}

/// Thread-safe reporter that keeps every call for later inspection.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    calls: Mutex<Vec<Recorded>>,
}

impl RecordingReporter {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    /// Names of all recorded calls, in order.
    pub fn names(&self) -> Vec<String> {
        self.calls().iter().map(|c| c.name().to_string()).collect()
    }

    fn push(&self, call: Recorded) {
        self.calls.lock().unwrap().push(call);
    }
}

impl EventReporter for RecordingReporter {
    fn report(&self, ctx: &Context, event_name: &str) {
        self.report_with_fields(ctx, event_name, &Kvs::new());
    }

    fn report_with_fields(&self, _ctx: &Context, event_name: &str, kvs: &Kvs) {
        self.push(Recorded::Event {
            name: event_name.to_string(),
            kvs: kvs.clone(),
        });
    }

    fn report_error(&self, ctx: &Context, event_name: &str, err: anyhow::Error) -> anyhow::Error {
        self.report_error_with_fields(ctx, event_name, err, &Kvs::new())
    }

    fn report_error_with_fields(
        &self,
        _ctx: &Context,
        event_name: &str,
        err: anyhow::Error,
        kvs: &Kvs,
    ) -> anyhow::Error {
        self.push(Recorded::Error {
            name: event_name.to_string(),
            message: err.to_string(),
            kvs: kvs.clone(),
        });
        err
    }

    fn report_timing(&self, ctx: &Context, event_name: &str, nanoseconds: i64) {
        self.report_timing_with_fields(ctx, event_name, nanoseconds, &Kvs::new());
    }

    fn report_timing_with_fields(
        &self,
        _ctx: &Context,
        event_name: &str,
        nanoseconds: i64,
        kvs: &Kvs,
    ) {
        self.push(Recorded::Timing {
            name: event_name.to_string(),
            nanoseconds,
            kvs: kvs.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_temp_dir() {
        let fixture = TestFixture::new();
        assert!(fixture.temp_dir.path().exists());
        assert!(fixture.db_path.ends_with("test.db"));
    }
}
