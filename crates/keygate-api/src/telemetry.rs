//! Log output and span export
//!
//! Logs always go to stdout through `tracing-subscriber`. When the server is
//! built with the `otel` feature and `tracing.endpoint` is set, spans are also
//! batched to an OTLP/HTTP collector such as Jaeger. Export runs on its own
//! thread; a missing or unreachable collector never fails startup or a request.
//!
//! Author: hephaex@gmail.com

use keygate_core::config::{LoggingConfig, TracingConfig};
use tracing::Subscriber;
use tracing_subscriber::{
    layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Handle to the span exporter, if one is running
///
/// Call [`Telemetry::shutdown`] before exit so buffered spans are flushed.
#[derive(Default)]
pub struct Telemetry {
    #[cfg(feature = "otel")]
    provider: Option<opentelemetry_sdk::trace::SdkTracerProvider>,
    warning: Option<String>,
}

impl Telemetry {
    /// Whether spans are being exported
    pub fn is_exporting(&self) -> bool {
        #[cfg(feature = "otel")]
        {
            self.provider.is_some()
        }
        #[cfg(not(feature = "otel"))]
        {
            false
        }
    }

    /// Flush and stop the exporter
    pub fn shutdown(self) {
        #[cfg(feature = "otel")]
        if let Some(provider) = self.provider {
            if let Err(e) = provider.shutdown() {
                tracing::warn!(error = %e, "Span exporter did not shut down cleanly");
            }
        }
    }
}

/// Default filter when `RUST_LOG` is unset
pub fn default_filter(logging: &LoggingConfig) -> String {
    let level = &logging.level;
    format!("keygate_api={level},keygate_core={level},keygate_cache={level},tower_http=debug")
}

/// Build the subscriber without installing it
pub fn subscriber(
    logging: &LoggingConfig,
    tracing_config: &TracingConfig,
) -> (impl Subscriber + Send + Sync + 'static, Telemetry) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(logging).into());

    let fmt_layer: BoxedLayer = if logging.json_format {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    let mut layers = vec![fmt_layer];
    let telemetry = match tracing_config.endpoint.as_deref() {
        Some(endpoint) => span_export(endpoint, &tracing_config.service_name, &mut layers),
        None => Telemetry::default(),
    };

    let subscriber = tracing_subscriber::registry().with(layers).with(filter);
    (subscriber, telemetry)
}

/// Install the global subscriber
pub fn init_tracing(
    logging: &LoggingConfig,
    tracing_config: &TracingConfig,
) -> anyhow::Result<Telemetry> {
    let (subscriber, telemetry) = subscriber(logging, tracing_config);
    subscriber.try_init()?;

    if let Some(warning) = &telemetry.warning {
        tracing::warn!("{warning}; continuing without span export");
    } else if telemetry.is_exporting() {
        tracing::info!(
            endpoint = tracing_config.endpoint.as_deref().unwrap_or_default(),
            service = %tracing_config.service_name,
            "Exporting spans"
        );
    }

    Ok(telemetry)
}

#[cfg(feature = "otel")]
fn span_export(endpoint: &str, service_name: &str, layers: &mut Vec<BoxedLayer>) -> Telemetry {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::{trace::SdkTracerProvider, Resource};

    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
    {
        Ok(exporter) => exporter,
        Err(e) => {
            return Telemetry {
                provider: None,
                warning: Some(format!("Span exporter for {endpoint} unavailable: {e}")),
            }
        }
    };

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(
            Resource::builder()
                .with_service_name(service_name.to_string())
                .build(),
        )
        .build();

    let tracer = provider.tracer("keygate-api");
    layers.push(tracing_opentelemetry::layer().with_tracer(tracer).boxed());

    Telemetry {
        provider: Some(provider),
        warning: None,
    }
}

#[cfg(not(feature = "otel"))]
fn span_export(endpoint: &str, _service_name: &str, _layers: &mut Vec<BoxedLayer>) -> Telemetry {
    Telemetry {
        warning: Some(format!(
            "Span export to {endpoint} requested but the otel feature is not enabled"
        )),
    }
}
