//! Event reporting contract for database access layers.
//!
//! Provides:
//! - [`EventReporter`]: the six context-aware reporting operations
//! - [`NullEventReporter`]: the no-op default receiver
//! - [`PlainEventReporter`]: the context-free sibling and its adapter
//! - [`LogReporter`] and [`MetricsReporter`]: receivers backed by tracing
//!   and OpenTelemetry

pub mod log;
pub mod metrics;
pub mod null;
pub mod plain;

pub use self::log::LogReporter;
pub use self::metrics::MetricsReporter;
pub use self::null::{null_reporter, shared_null_reporter, NullEventReporter};
pub use self::plain::{IgnoreContext, PlainEventReporter};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::context::Context;

/// Key/value metadata attached to an event. Keys are unique, order is not
/// meaningful.
pub type Kvs = HashMap<String, String>;

/// A reporter that can be shared across threads.
pub type SharedReporter = Arc<dyn EventReporter + Send + Sync>;

/// Receives events from the database access layer.
///
/// Every operation takes the caller's [`Context`] first so receivers that
/// forward to a remote backend can honor cancellation or attach request
/// values. Receivers are free to ignore it.
///
/// # Error pass-through
///
/// [`report_error`](Self::report_error) and
/// [`report_error_with_fields`](Self::report_error_with_fields) must return
/// the error they were given, untouched. Callers rely on this to log and
/// propagate in one step:
///
/// ```
/// use sqlhook::context::Context;
/// use sqlhook::reporter::{null_reporter, EventReporter};
///
/// fn load(ctx: &Context) -> anyhow::Result<()> {
///     let err = anyhow::anyhow!("row not found");
///     Err(null_reporter().report_error(ctx, "load", err))
/// }
///
/// assert!(load(&Context::background()).is_err());
/// ```
///
/// # Concurrency
///
/// The contract does not require implementations to be thread-safe. A
/// receiver that is shared between threads (see [`SharedReporter`]) must
/// provide its own synchronization.
pub trait EventReporter {
    /// Record that a named event occurred.
    fn report(&self, ctx: &Context, event_name: &str);

    /// Record a named event with attached metadata.
    fn report_with_fields(&self, ctx: &Context, event_name: &str, kvs: &Kvs);

    /// Record a failure and hand the same error back.
    fn report_error(&self, ctx: &Context, event_name: &str, err: anyhow::Error) -> anyhow::Error;

    /// Record a failure with metadata and hand the same error back.
    fn report_error_with_fields(
        &self,
        ctx: &Context,
        event_name: &str,
        err: anyhow::Error,
        kvs: &Kvs,
    ) -> anyhow::Error;

    /// Record how long an event took, in nanoseconds.
    fn report_timing(&self, ctx: &Context, event_name: &str, nanoseconds: i64);

    /// Record how long an event took, with metadata.
    fn report_timing_with_fields(
        &self,
        ctx: &Context,
        event_name: &str,
        nanoseconds: i64,
        kvs: &Kvs,
    );
}

/// Conveniences built on the six core operations. Implemented for every
/// [`EventReporter`], including trait objects.
pub trait EventReporterExt: EventReporter {
    /// Pass `Ok` through silently, report `Err` and pass it through.
    fn report_result<T>(
        &self,
        ctx: &Context,
        event_name: &str,
        result: anyhow::Result<T>,
    ) -> anyhow::Result<T> {
        result.map_err(|err| self.report_error(ctx, event_name, err))
    }

    /// Report the time elapsed since `start`.
    fn report_elapsed(&self, ctx: &Context, event_name: &str, start: Instant, kvs: &Kvs) {
        let nanoseconds = i64::try_from(start.elapsed().as_nanos()).unwrap_or(i64::MAX);
        self.report_timing_with_fields(ctx, event_name, nanoseconds, kvs);
    }
}

impl<R: EventReporter + ?Sized> EventReporterExt for R {}

macro_rules! forward_reporter {
    ($($ty:ty),*) => {$(
        impl<R: EventReporter + ?Sized> EventReporter for $ty {
            fn report(&self, ctx: &Context, event_name: &str) {
                (**self).report(ctx, event_name);
            }

            fn report_with_fields(&self, ctx: &Context, event_name: &str, kvs: &Kvs) {
                (**self).report_with_fields(ctx, event_name, kvs);
            }

            fn report_error(
                &self,
                ctx: &Context,
                event_name: &str,
                err: anyhow::Error,
            ) -> anyhow::Error {
                (**self).report_error(ctx, event_name, err)
            }

            fn report_error_with_fields(
                &self,
                ctx: &Context,
                event_name: &str,
                err: anyhow::Error,
                kvs: &Kvs,
            ) -> anyhow::Error {
                (**self).report_error_with_fields(ctx, event_name, err, kvs)
            }

            fn report_timing(&self, ctx: &Context, event_name: &str, nanoseconds: i64) {
                (**self).report_timing(ctx, event_name, nanoseconds);
            }

            fn report_timing_with_fields(
                &self,
                ctx: &Context,
                event_name: &str,
                nanoseconds: i64,
                kvs: &Kvs,
            ) {
                (**self).report_timing_with_fields(ctx, event_name, nanoseconds, kvs);
            }
        }
    )*};
}

forward_reporter!(&R, Box<R>, Arc<R>);

/// Build a [`Kvs`] from borrowed pairs.
pub fn kvs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Kvs {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect()
}
