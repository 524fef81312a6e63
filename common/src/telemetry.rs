//! Provides helper functions for initializing telemetry collection and publication.
use std::time::Duration;

use anyhow::Result;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{metrics::MeterProvider, runtime, trace, Resource};
use tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter, Registry};

/// Handle on the installed telemetry pipelines, used to flush them before exit.
pub struct Telemetry {
    meter_provider: Option<MeterProvider>,
}

impl Telemetry {
    /// Flush traces and metrics. Safe to call when no exporter was configured.
    pub fn shutdown(self) -> Result<()> {
        if let Some(provider) = self.meter_provider {
            global::shutdown_tracer_provider();
            provider.shutdown()?;
        }
        Ok(())
    }
}

fn resource() -> Resource {
    Resource::new(vec![
        KeyValue::new(
            "hostname",
            gethostname::gethostname()
                .into_string()
                .unwrap_or_else(|_| "unknown".to_owned()),
        ),
        KeyValue::new("service.name", "ucac"),
    ])
}

/// Initialize logging, and tracing plus metrics export when an OTLP endpoint is given.
pub async fn init(otlp_endpoint: Option<String>) -> Result<Telemetry> {
    let (tracer, meter_provider) = if let Some(endpoint) = otlp_endpoint {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(
                opentelemetry_otlp::new_exporter()
                    .tonic()
                    .with_endpoint(endpoint.clone()),
            )
            .with_trace_config(trace::config().with_resource(resource()))
            .install_batch(runtime::Tokio)?;

        let meter_provider = opentelemetry_otlp::new_pipeline()
            .metrics(runtime::Tokio)
            .with_exporter(
                opentelemetry_otlp::new_exporter()
                    .tonic()
                    .with_endpoint(endpoint),
            )
            .with_resource(resource())
            .with_period(Duration::from_secs(10))
            .build()?;
        global::set_meter_provider(meter_provider.clone());

        (Some(tracer), Some(meter_provider))
    } else {
        (None, None)
    };

    // Default to INFO if no env is specified
    let log_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?;
    let otlp_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?;

    let telemetry = tracer.map(|tracer| {
        tracing_opentelemetry::layer()
            .with_tracer(tracer)
            .with_filter(otlp_filter)
    });
    let logger = tracing_subscriber::fmt::layer()
        .with_ansi(true)
        .compact()
        .with_filter(log_filter);

    let collector = Registry::default().with(telemetry).with(logger);

    tracing::subscriber::set_global_default(collector)?;

    Ok(Telemetry { meter_provider })
}
