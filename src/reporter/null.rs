//! No-op reporter used when the caller does not supply one.

use std::sync::Arc;

use super::{EventReporter, Kvs, PlainEventReporter, SharedReporter};
use crate::context::Context;

static NULL_REPORTER: NullEventReporter = NullEventReporter;

/// Sentinel reporter. Use it if the caller doesn't supply one.
///
/// Every operation is a no-op; the error operations return their input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NullEventReporter;

/// The process-wide null reporter.
#[must_use]
pub fn null_reporter() -> &'static NullEventReporter {
    &NULL_REPORTER
}

/// A null reporter ready to store wherever a [`SharedReporter`] is expected.
#[must_use]
pub fn shared_null_reporter() -> SharedReporter {
    Arc::new(NullEventReporter)
}

impl EventReporter for NullEventReporter {
    fn report(&self, _ctx: &Context, _event_name: &str) {}

    fn report_with_fields(&self, _ctx: &Context, _event_name: &str, _kvs: &Kvs) {}

    fn report_error(&self, _ctx: &Context, _event_name: &str, err: anyhow::Error) -> anyhow::Error {
        err
    }

    fn report_error_with_fields(
        &self,
        _ctx: &Context,
        _event_name: &str,
        err: anyhow::Error,
        _kvs: &Kvs,
    ) -> anyhow::Error {
        err
    }

    fn report_timing(&self, _ctx: &Context, _event_name: &str, _nanoseconds: i64) {}

    fn report_timing_with_fields(
        &self,
        _ctx: &Context,
        _event_name: &str,
        _nanoseconds: i64,
        _kvs: &Kvs,
    ) {
    }
}

impl PlainEventReporter for NullEventReporter {
    fn event(&self, _event_name: &str) {}

    fn event_with_fields(&self, _event_name: &str, _kvs: &Kvs) {}

    fn event_error(&self, _event_name: &str, err: anyhow::Error) -> anyhow::Error {
        err
    }

    fn event_error_with_fields(
        &self,
        _event_name: &str,
        err: anyhow::Error,
        _kvs: &Kvs,
    ) -> anyhow::Error {
        err
    }

    fn timing(&self, _event_name: &str, _nanoseconds: i64) {}

    fn timing_with_fields(&self, _event_name: &str, _nanoseconds: i64, _kvs: &Kvs) {}
}
