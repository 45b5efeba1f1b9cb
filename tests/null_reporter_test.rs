//! Contract tests for the null reporter.
//!
//! Tests:
//! - Error operations hand back the exact error they were given
//! - No-op operations accept any input, including a cancelled context
//! - The shared instance can be hammered from many threads and tasks

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use sqlhook::context::Context;
use sqlhook::reporter::{
    kvs, null_reporter, shared_null_reporter, EventReporter, EventReporterExt, IgnoreContext, Kvs,
    NullEventReporter, SharedReporter,
};

#[derive(Debug, thiserror::Error)]
#[error("not found")]
struct ErrNotFound;

fn error_addr(err: &anyhow::Error) -> *const () {
    let inner: &(dyn std::error::Error + Send + Sync + 'static) = err.as_ref();
    (inner as *const (dyn std::error::Error + Send + Sync)).cast::<()>()
}

fn exercise_all(reporter: &dyn EventReporter, ctx: &Context, i: i64) {
    let fields = kvs([("worker", "n")]);
    reporter.report(ctx, "query.exec");
    reporter.report_with_fields(ctx, "query.exec", &fields);
    let err = reporter.report_error(ctx, "query.exec", anyhow::Error::new(ErrNotFound));
    let err = reporter.report_error_with_fields(ctx, "query.exec", err, &fields);
    assert!(err.is::<ErrNotFound>());
    reporter.report_timing(ctx, "query.exec", i);
    reporter.report_timing_with_fields(ctx, "query.exec", i.wrapping_neg(), &fields);
}

#[test]
fn test_report_error_scenario_returns_err_not_found() {
    let ctx = Context::background();
    let err = anyhow::Error::new(ErrNotFound);
    let before = error_addr(&err);

    let err2 = null_reporter().report_error(&ctx, "query.exec", err);

    assert_eq!(error_addr(&err2), before);
    assert!(err2.downcast_ref::<ErrNotFound>().is_some());
}

#[test]
fn test_report_error_with_fields_is_identity_for_any_fields() {
    let ctx = Context::background();
    let field_sets = [
        Kvs::new(),
        kvs([("sql", "SELECT * FROM users WHERE id = ?")]),
        kvs([("", ""), ("a", "b"), ("unicode", "żółw")]),
    ];

    for fields in &field_sets {
        for name in ["", "query.exec", "a much longer event name with spaces"] {
            let err = anyhow::anyhow!("constraint violated").context("insert failed");
            let before = error_addr(&err);
            let returned = null_reporter().report_error_with_fields(&ctx, name, err, fields);
            assert_eq!(error_addr(&returned), before);
            assert_eq!(format!("{returned:#}"), "insert failed: constraint violated");
        }
    }
}

#[test]
fn test_absent_error_passes_through_untouched() {
    let ctx = Context::background();
    let ok: anyhow::Result<&str> = Ok("row");
    assert_eq!(null_reporter().report_result(&ctx, "query.exec", ok).unwrap(), "row");
}

#[test]
fn test_report_timing_scenario() {
    let ctx = Context::background();
    null_reporter().report_timing(&ctx, "query.exec", 1_500_000);
}

#[test]
fn test_noop_operations_on_done_contexts() {
    let cancelled = Context::background().with_cancel();
    cancelled.cancel();
    let expired = Context::background().with_timeout(Duration::ZERO);

    for ctx in [&cancelled, &expired] {
        assert!(ctx.is_done());
        for ns in [0, -1, i64::MIN, i64::MAX] {
            exercise_all(null_reporter(), ctx, ns);
        }
        null_reporter().report(ctx, "");
        null_reporter().report_with_fields(ctx, "", &Kvs::new());
    }
}

#[test]
fn test_concurrent_threads_on_shared_instance() {
    let shared: SharedReporter = shared_null_reporter();
    let ctx = Context::background().with_value("request_id", "load");

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let reporter = Arc::clone(&shared);
            let ctx = ctx.clone();
            thread::spawn(move || {
                for n in 0..1_000 {
                    exercise_all(&*reporter, &ctx, i * 1_000 + n);
                    exercise_all(null_reporter(), &ctx, n);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker panicked");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_tasks_on_shared_instance() {
    let ctx = Context::background();
    let tasks = (0..64).map(|i| {
        let ctx = ctx.with_cancel();
        tokio::spawn(async move {
            exercise_all(null_reporter(), &ctx, i);
            if i % 2 == 0 {
                ctx.cancel();
            }
            exercise_all(&NullEventReporter, &ctx, i);
        })
    });

    for result in futures::future::join_all(tasks).await {
        result.expect("task panicked");
    }
    assert!(!ctx.is_cancelled());
}

#[test]
fn test_null_instances_are_interchangeable() {
    let ctx = Context::background();
    let adapted = IgnoreContext::new(NullEventReporter);
    let reporters: [&dyn EventReporter; 3] = [null_reporter(), &NullEventReporter, &adapted];

    for reporter in reporters {
        exercise_all(reporter, &ctx, 42);
    }
}
