//! Reporter that writes events through `tracing`.
//!
//! Events and timings are emitted at a configurable level, errors always at
//! `ERROR`. Everything goes to the `sqlhook::events` target so the stream can
//! be filtered on its own, e.g. `RUST_LOG=info,sqlhook::events=debug`.

use std::fmt;

use tracing::{event, Level};

use super::{EventReporter, Kvs};
use crate::context::Context;

const TARGET: &str = "sqlhook::events";

/// Emit at a runtime level; `event!` wants a constant one.
macro_rules! emit {
    ($level:expr, $($rest:tt)+) => {
        match $level {
            Level::ERROR => event!(target: TARGET, Level::ERROR, $($rest)+),
            Level::WARN => event!(target: TARGET, Level::WARN, $($rest)+),
            Level::INFO => event!(target: TARGET, Level::INFO, $($rest)+),
            Level::DEBUG => event!(target: TARGET, Level::DEBUG, $($rest)+),
            Level::TRACE => event!(target: TARGET, Level::TRACE, $($rest)+),
        }
    };
}

/// Request values of a context, formatted as a map.
struct Values<'a>(&'a Context);

impl fmt::Debug for Values<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.values()).finish()
    }
}

/// Logs every reported event as a structured `tracing` event.
#[derive(Debug, Clone, Copy)]
pub struct LogReporter {
    level: Level,
}

impl LogReporter {
    /// Create a reporter that logs events and timings at `level`.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }
}

impl Default for LogReporter {
    fn default() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl EventReporter for LogReporter {
    fn report(&self, ctx: &Context, event_name: &str) {
        emit!(self.level, event = event_name, ctx = ?Values(ctx), "event");
    }

    fn report_with_fields(&self, ctx: &Context, event_name: &str, kvs: &Kvs) {
        emit!(self.level, event = event_name, kvs = ?kvs, ctx = ?Values(ctx), "event");
    }

    fn report_error(&self, ctx: &Context, event_name: &str, err: anyhow::Error) -> anyhow::Error {
        tracing::error!(
            target: TARGET,
            event = event_name,
            error = %format_args!("{err:#}"),
            ctx = ?Values(ctx),
            "event failed"
        );
        err
    }

    fn report_error_with_fields(
        &self,
        ctx: &Context,
        event_name: &str,
        err: anyhow::Error,
        kvs: &Kvs,
    ) -> anyhow::Error {
        tracing::error!(
            target: TARGET,
            event = event_name,
            error = %format_args!("{err:#}"),
            kvs = ?kvs,
            ctx = ?Values(ctx),
            "event failed"
        );
        err
    }

    fn report_timing(&self, ctx: &Context, event_name: &str, nanoseconds: i64) {
        emit!(self.level, event = event_name, nanoseconds, ctx = ?Values(ctx), "timing");
    }

    fn report_timing_with_fields(
        &self,
        ctx: &Context,
        event_name: &str,
        nanoseconds: i64,
        kvs: &Kvs,
    ) {
        emit!(
            self.level,
            event = event_name,
            nanoseconds,
            kvs = ?kvs,
            ctx = ?Values(ctx),
            "timing"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::kvs;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn capture(f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(Level::TRACE)
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        captured.contents()
    }

    #[test]
    fn test_events_are_logged_with_fields() {
        let ctx = Context::background().with_value("request_id", "r-42");
        let reporter = LogReporter::new(Level::INFO);

        let output = capture(|| {
            reporter.report_with_fields(&ctx, "session.exec", &kvs([("sql", "SELECT 1")]));
            reporter.report_timing(&ctx, "query.exec", 1_500_000);
        });

        assert!(output.contains("INFO"));
        assert!(output.contains("session.exec"));
        assert!(output.contains("SELECT 1"));
        assert!(output.contains("r-42"));
        assert!(output.contains("nanoseconds=1500000"));
    }

    #[test]
    fn test_errors_are_logged_and_passed_through() {
        let ctx = Context::background();
        let reporter = LogReporter::default();

        let mut returned = None;
        let output = capture(|| {
            let err = anyhow::anyhow!("disk I/O error").context("exec failed");
            let fields = Kvs::new();
            let err = reporter.report_error_with_fields(&ctx, "session.exec.exec", err, &fields);
            returned = Some(err);
        });

        let err = returned.unwrap();
        assert_eq!(err.to_string(), "exec failed");
        assert!(output.contains("ERROR"));
        assert!(output.contains("exec failed: disk I/O error"));
    }

    #[test]
    fn test_level_below_filter_is_silent() {
        let ctx = Context::background();
        let reporter = LogReporter::new(Level::TRACE);
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(Level::INFO)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            reporter.report(&ctx, "quiet");
            reporter.report_timing_with_fields(&ctx, "quiet", -1, &Kvs::new());
        });

        assert!(captured.contents().is_empty());
    }
}
