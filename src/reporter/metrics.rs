//! Reporter that records events as OpenTelemetry metrics.
//!
//! Instruments:
//! - sqlhook_events_total: Counter for plain events
//! - sqlhook_errors_total: Counter for reported errors
//! - sqlhook_timing_seconds: Histogram for reported timings
//!
//! Each data point carries an `event` attribute plus the event's key/value
//! fields. A field named `event` is dropped so it cannot replace the event
//! name.

use opentelemetry::global;
use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::KeyValue;

use super::{EventReporter, Kvs};
use crate::context::Context;

/// Meter name used by [`MetricsReporter::global`].
pub const METER_NAME: &str = "sqlhook";

const EVENT_KEY: &str = "event";

/// Forwards events to OpenTelemetry instruments.
#[derive(Debug, Clone)]
pub struct MetricsReporter {
    events_total: Counter<u64>,
    errors_total: Counter<u64>,
    timing: Histogram<f64>,
}

impl MetricsReporter {
    /// Build the instruments from the given meter.
    pub fn new(meter: &Meter) -> Self {
        Self {
            events_total: meter
                .u64_counter("sqlhook_events_total")
                .with_description("Total number of reported events")
                .with_unit("1")
                .init(),
            errors_total: meter
                .u64_counter("sqlhook_errors_total")
                .with_description("Total number of reported errors")
                .with_unit("1")
                .init(),
            timing: meter
                .f64_histogram("sqlhook_timing_seconds")
                .with_description("Reported event durations")
                .with_unit("s")
                .init(),
        }
    }

    /// Build the instruments from the global meter provider.
    ///
    /// Call [`crate::observability::metrics::init_metrics`] first, otherwise
    /// the global no-op provider is used and nothing is recorded.
    pub fn global() -> Self {
        Self::new(&global::meter(METER_NAME))
    }

    fn attributes(event_name: &str, kvs: Option<&Kvs>) -> Vec<KeyValue> {
        let mut attrs = Vec::with_capacity(1 + kvs.map_or(0, Kvs::len));
        attrs.push(KeyValue::new(EVENT_KEY, event_name.to_string()));
        if let Some(kvs) = kvs {
            attrs.extend(
                kvs.iter()
                    .filter(|(k, _)| k.as_str() != EVENT_KEY)
                    .map(|(k, v)| KeyValue::new(k.clone(), v.clone())),
            );
        }
        attrs
    }

    fn record_timing(&self, event_name: &str, nanoseconds: i64, kvs: Option<&Kvs>) {
        // Histograms reject negative values.
        let seconds = nanoseconds.max(0) as f64 / 1e9;
        self.timing
            .record(seconds, &Self::attributes(event_name, kvs));
    }
}

impl EventReporter for MetricsReporter {
    fn report(&self, _ctx: &Context, event_name: &str) {
        self.events_total
            .add(1, &Self::attributes(event_name, None));
    }

    fn report_with_fields(&self, _ctx: &Context, event_name: &str, kvs: &Kvs) {
        self.events_total
            .add(1, &Self::attributes(event_name, Some(kvs)));
    }

    fn report_error(&self, _ctx: &Context, event_name: &str, err: anyhow::Error) -> anyhow::Error {
        self.errors_total
            .add(1, &Self::attributes(event_name, None));
        err
    }

    fn report_error_with_fields(
        &self,
        _ctx: &Context,
        event_name: &str,
        err: anyhow::Error,
        kvs: &Kvs,
    ) -> anyhow::Error {
        self.errors_total
            .add(1, &Self::attributes(event_name, Some(kvs)));
        err
    }

    fn report_timing(&self, _ctx: &Context, event_name: &str, nanoseconds: i64) {
        self.record_timing(event_name, nanoseconds, None);
    }

    fn report_timing_with_fields(
        &self,
        _ctx: &Context,
        event_name: &str,
        nanoseconds: i64,
        kvs: &Kvs,
    ) {
        self.record_timing(event_name, nanoseconds, Some(kvs));
    }
}
