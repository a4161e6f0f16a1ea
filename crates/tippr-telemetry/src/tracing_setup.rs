//! Subscriber setup.
//!
//! Installs an `EnvFilter`, a pretty or JSON stdout layer and, with the
//! `otlp` feature, an OpenTelemetry layer exporting spans over OTLP/gRPC.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{TelemetryConfig, TelemetryError};

/// Guard that shuts down the tracer provider on drop.
#[derive(Default)]
pub struct TracingGuard {
    #[cfg(feature = "otlp")]
    provider: Option<opentelemetry_sdk::trace::TracerProvider>,
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        #[cfg(feature = "otlp")]
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("Error shutting down tracer provider: {:?}", e);
            }
        }
    }
}

fn env_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(&config.log_level).map_err(|e| TelemetryError::Config(e.to_string()))
}

/// Install the global subscriber.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(config: &TelemetryConfig) -> Result<TracingGuard, TelemetryError> {
    let filter = env_filter(config)?;

    let json_layer = (config.console_output && config.json_logs).then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
    });
    let pretty_layer = (config.console_output && !config.json_logs).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
    });

    #[cfg(feature = "otlp")]
    {
        use opentelemetry::trace::TracerProvider;

        let provider = otlp::provider(config)?;
        let otel_layer =
            tracing_opentelemetry::layer().with_tracer(provider.tracer(config.full_service_name()));

        tracing_subscriber::registry()
            .with(filter)
            .with(otel_layer)
            .with(json_layer)
            .with(pretty_layer)
            .try_init()
            .map_err(|e| TelemetryError::TracerInit(e.to_string()))?;

        tracing::info!(
            service = %config.full_service_name(),
            otlp_endpoint = %config.otlp_endpoint,
            "OpenTelemetry tracing initialized"
        );
        Ok(TracingGuard {
            provider: Some(provider),
        })
    }

    #[cfg(not(feature = "otlp"))]
    {
        tracing_subscriber::registry()
            .with(filter)
            .with(json_layer)
            .with(pretty_layer)
            .try_init()
            .map_err(|e| TelemetryError::TracerInit(e.to_string()))?;

        tracing::debug!(service = %config.full_service_name(), "Logging initialized");
        Ok(TracingGuard::default())
    }
}

#[cfg(feature = "otlp")]
mod otlp {
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::{
        runtime,
        trace::{self, RandomIdGenerator, Sampler},
        Resource,
    };

    use crate::{TelemetryConfig, TelemetryError};

    pub(super) fn provider(
        config: &TelemetryConfig,
    ) -> Result<opentelemetry_sdk::trace::TracerProvider, TelemetryError> {
        let exporter = opentelemetry_otlp::new_exporter()
            .tonic()
            .with_endpoint(&config.otlp_endpoint);

        opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(exporter)
            .with_trace_config(
                trace::Config::default()
                    .with_sampler(Sampler::AlwaysOn)
                    .with_id_generator(RandomIdGenerator::default())
                    .with_resource(Resource::new(vec![
                        KeyValue::new("service.name", config.full_service_name()),
                        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                        KeyValue::new("deployment.environment", config.environment.clone()),
                    ])),
            )
            .install_batch(runtime::Tokio)
            .map_err(|e| TelemetryError::TracerInit(e.to_string()))
    }
}
