//! # Tippr Telemetry
//!
//! Observability for Tippr workers.
//!
//! ## Components
//!
//! - **Logs**: `tracing-subscriber` with an `EnvFilter`, pretty or JSON output
//! - **Metrics**: Prometheus registry rendered in text format
//! - **Traces**: OpenTelemetry OTLP export (feature `otlp`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tippr_telemetry::{init_telemetry, TelemetryConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::from_env())?;
//!     // ...
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `TIPPR_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `TIPPR_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |
//! | `TIPPR_METRICS_PORT` | `9184` | Prometheus exporter port |
//! | `TIPPR_WORKER_ID` | empty | Suffix for the service name |
//! | `OTEL_SERVICE_NAME` | `tippr-worker` | Service name in traces |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | `http://localhost:4317` | Collector endpoint |

mod config;
mod logging;
pub mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{gather_metrics, register_metrics, HistogramTimer};
pub use tracing_setup::TracingGuard;

#[doc(hidden)]
pub use tracing;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing: {0}")]
    TracerInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging, tracing and the metrics registry.
///
/// Returns a guard that must be held for the lifetime of the application;
/// dropping it flushes pending spans.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    register_metrics()?;
    let tracing = tracing_setup::init_tracing(&config)?;
    Ok(TelemetryGuard { _tracing: tracing })
}

/// Guard that keeps telemetry active. Drop to flush and shutdown.
pub struct TelemetryGuard {
    _tracing: TracingGuard,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry");
    }
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
