//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for logging, metrics and tracing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name for traces and logs
    pub service_name: String,

    /// Worker identifier, appended to the service name when set
    pub worker_id: String,

    /// OpenTelemetry OTLP endpoint (only used with the `otlp` feature)
    pub otlp_endpoint: String,

    /// Log filter directive (trace, debug, info, warn, error, or a full EnvFilter string)
    pub log_level: String,

    /// Whether to write logs to stdout
    pub console_output: bool,

    /// Whether to format logs as JSON
    pub json_logs: bool,

    /// Port of the Prometheus text exporter (0 disables it)
    pub metrics_port: u16,

    /// Deployment environment label
    pub environment: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "tippr-worker".to_string(),
            worker_id: String::new(),
            otlp_endpoint: "http://localhost:4317".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            metrics_port: 9184,
            environment: "development".to_string(),
        }
    }
}

fn flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OTEL_SERVICE_NAME`: Service name (default: tippr-worker)
    /// - `TIPPR_WORKER_ID`: Worker identifier (default: empty)
    /// - `OTEL_EXPORTER_OTLP_ENDPOINT`: Collector endpoint (default: http://localhost:4317)
    /// - `TIPPR_LOG_LEVEL` or `RUST_LOG`: Log filter (default: info)
    /// - `TIPPR_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `TIPPR_JSON_LOGS`: JSON logs (default: false locally, true in containers)
    /// - `TIPPR_METRICS_PORT`: Prometheus exporter port (default: 9184)
    /// - `TIPPR_ENVIRONMENT`: Deployment label (default: development)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("OTEL_SERVICE_NAME").unwrap_or(defaults.service_name),

            worker_id: env::var("TIPPR_WORKER_ID").unwrap_or(defaults.worker_id),

            otlp_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT").unwrap_or(defaults.otlp_endpoint),

            log_level: env::var("TIPPR_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or(defaults.log_level),

            console_output: env::var("TIPPR_CONSOLE_OUTPUT")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),

            json_logs: env::var("TIPPR_JSON_LOGS")
                .map(|v| flag(&v))
                .unwrap_or(is_container),

            metrics_port: env::var("TIPPR_METRICS_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.metrics_port),

            environment: env::var("TIPPR_ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Service name including the worker id.
    pub fn full_service_name(&self) -> String {
        if self.worker_id.is_empty() {
            self.service_name.clone()
        } else {
            format!("{}-{}", self.service_name, self.worker_id)
        }
    }
}
