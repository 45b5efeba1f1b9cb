//! OpenTelemetry meter provider setup.
//!
//! Installs the global meter provider that [`MetricsReporter::global`]
//! builds its instruments from.
//!
//! With an endpoint, metrics are pushed over OTLP/gRPC every
//! [`EXPORT_PERIOD`] and once more by [`shutdown_metrics`], so short runs
//! still export. Without one, the provider only aggregates in process:
//! nothing is exported, and the reporter is useful for embedding callers
//! that read the global provider themselves.
//!
//! [`MetricsReporter::global`]: crate::reporter::MetricsReporter::global

use opentelemetry::global;
use opentelemetry_sdk::metrics::{ManualReader, SdkMeterProvider};
use std::sync::OnceLock;
use std::time::Duration;

/// Push interval for the OTLP exporter.
pub const EXPORT_PERIOD: Duration = Duration::from_secs(10);

static PROVIDER: OnceLock<SdkMeterProvider> = OnceLock::new();

fn in_process_provider() -> SdkMeterProvider {
    let reader = ManualReader::builder().build();
    SdkMeterProvider::builder().with_reader(reader).build()
}

fn otlp_provider(endpoint: &str) -> SdkMeterProvider {
    use opentelemetry_otlp::{Protocol, WithExportConfig};

    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint)
        .with_protocol(Protocol::Grpc);

    let built = opentelemetry_otlp::new_pipeline()
        .metrics(opentelemetry_sdk::runtime::Tokio)
        .with_exporter(exporter)
        .with_period(EXPORT_PERIOD)
        .build();

    match built {
        Ok(provider) => {
            tracing::info!(endpoint, "Exporting session metrics over OTLP");
            provider
        }
        Err(e) => {
            tracing::warn!(
                endpoint,
                error = %e,
                "OTLP export unavailable, session metrics stay in process"
            );
            in_process_provider()
        }
    }
}

/// Initialize the global meter provider.
///
/// This should be called once at startup. Subsequent calls are ignored.
/// The OTLP exporter needs a running tokio runtime. Call
/// [`shutdown_metrics`] before exiting to push what is still buffered.
///
/// # Arguments
///
/// * `otel_endpoint` - Optional OTLP endpoint for metrics export
pub fn init_metrics_with_endpoint(otel_endpoint: Option<&str>) {
    PROVIDER.get_or_init(|| {
        let provider = match otel_endpoint {
            Some(endpoint) => otlp_provider(endpoint),
            None => {
                tracing::info!("No OTLP endpoint, session metrics are aggregated in process only");
                in_process_provider()
            }
        };
        global::set_meter_provider(provider.clone());
        provider
    });
}

/// Initialize the global meter provider without OTLP export.
///
/// This should be called once at startup. Subsequent calls are ignored.
pub fn init_metrics() {
    init_metrics_with_endpoint(None);
}

/// Whether a meter provider has been installed by this module.
#[must_use]
pub fn is_initialized() -> bool {
    PROVIDER.get().is_some()
}

/// Flush and shut down the installed provider.
///
/// Pushes any pending OTLP export. Blocks until the exporter answers, so
/// call it from a blocking context. Does nothing when no provider was
/// installed; failures are logged, not returned.
pub fn shutdown_metrics() {
    let Some(provider) = PROVIDER.get() else {
        return;
    };
    if let Err(e) = provider.force_flush() {
        tracing::warn!(error = %e, "Failed to flush session metrics");
    }
    match provider.shutdown() {
        Ok(()) => tracing::debug!("Meter provider shut down"),
        Err(e) => tracing::warn!(error = %e, "Failed to shut down meter provider"),
    }
}
