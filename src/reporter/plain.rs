//! Context-free reporting contract.
//!
//! Older receivers that were written without context plumbing implement
//! [`PlainEventReporter`]. Wrap one in [`IgnoreContext`] to hand it to code
//! that expects an [`EventReporter`].

use super::{EventReporter, Kvs};
use crate::context::Context;

/// The six reporting operations without a context argument.
///
/// Same contract as [`EventReporter`]: the error operations return the error
/// they were given.
pub trait PlainEventReporter {
    fn event(&self, event_name: &str);

    fn event_with_fields(&self, event_name: &str, kvs: &Kvs);

    fn event_error(&self, event_name: &str, err: anyhow::Error) -> anyhow::Error;

    fn event_error_with_fields(
        &self,
        event_name: &str,
        err: anyhow::Error,
        kvs: &Kvs,
    ) -> anyhow::Error;

    fn timing(&self, event_name: &str, nanoseconds: i64);

    fn timing_with_fields(&self, event_name: &str, nanoseconds: i64, kvs: &Kvs);
}

/// Adapts a [`PlainEventReporter`] to [`EventReporter`] by dropping the
/// context.
#[derive(Debug, Clone, Default)]
pub struct IgnoreContext<R>(pub R);

impl<R> IgnoreContext<R> {
    pub fn new(inner: R) -> Self {
        Self(inner)
    }

    pub fn into_inner(self) -> R {
        self.0
    }
}

impl<R: PlainEventReporter> EventReporter for IgnoreContext<R> {
    fn report(&self, _ctx: &Context, event_name: &str) {
        self.0.event(event_name);
    }

    fn report_with_fields(&self, _ctx: &Context, event_name: &str, kvs: &Kvs) {
        self.0.event_with_fields(event_name, kvs);
    }

    fn report_error(&self, _ctx: &Context, event_name: &str, err: anyhow::Error) -> anyhow::Error {
        self.0.event_error(event_name, err)
    }

    fn report_error_with_fields(
        &self,
        _ctx: &Context,
        event_name: &str,
        err: anyhow::Error,
        kvs: &Kvs,
    ) -> anyhow::Error {
        self.0.event_error_with_fields(event_name, err, kvs)
    }

    fn report_timing(&self, _ctx: &Context, event_name: &str, nanoseconds: i64) {
        self.0.timing(event_name, nanoseconds);
    }

    fn report_timing_with_fields(
        &self,
        _ctx: &Context,
        event_name: &str,
        nanoseconds: i64,
        kvs: &Kvs,
    ) {
        self.0.timing_with_fields(event_name, nanoseconds, kvs);
    }
}
