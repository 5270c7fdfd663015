//! Metrics facade for the caption client
//!
//! A pluggable [`MetricsExporter`] sits behind a cloneable [`Metrics`] handle.
//! The domain helpers (`record_run_started`, `record_run_finished`, ...) never
//! fail: exporter errors are logged and dropped so that observability can never
//! change the outcome of a workflow run.
//!
//! ```rust,no_run
//! use caption_client::metrics::{create_metrics_exporter, Metrics};
//!
//! # async fn demo() {
//! let metrics = Metrics::new(create_metrics_exporter("prometheus"));
//! metrics.record_run_started("fr").await;
//! let text = metrics.export().await.unwrap_or_default();
//! println!("{}", String::from_utf8_lossy(&text));
//! # }
//! ```

use async_trait::async_trait;
use log::{debug, warn};
use std::sync::Arc;

use crate::metrics::error::MetricsError;
use crate::metrics::null::NullExporter;
use crate::metrics::prometheus::PrometheusExporter;

/// Metrics exporter trait for pluggable monitoring systems
#[async_trait]
pub trait MetricsExporter: Send + Sync {
    /// Increment a counter metric
    async fn increment(&self, name: &str, labels: &[(&str, &str)]) -> Result<(), MetricsError>;

    /// Set a gauge metric value
    async fn set_gauge(&self, name: &str, value: f64, labels: &[(&str, &str)]) -> Result<(), MetricsError>;

    /// Observe a value in a histogram metric
    async fn observe_histogram(&self, name: &str, value: f64, labels: &[(&str, &str)]) -> Result<(), MetricsError>;

    /// Export metrics in the format expected by the monitoring system
    async fn export(&self) -> Result<Vec<u8>, MetricsError>;
}

/// Metrics facade for the application
#[derive(Clone)]
pub struct Metrics {
    exporter: Arc<dyn MetricsExporter>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new(create_null_exporter())
    }
}

impl Metrics {
    pub fn new(exporter: Arc<dyn MetricsExporter>) -> Self {
        Self { exporter }
    }

    pub async fn increment(&self, name: &str, labels: &[(&str, &str)]) -> Result<(), MetricsError> {
        self.exporter.increment(name, labels).await
    }

    pub async fn set_gauge(&self, name: &str, value: f64, labels: &[(&str, &str)]) -> Result<(), MetricsError> {
        self.exporter.set_gauge(name, value, labels).await
    }

    pub async fn observe_histogram(&self, name: &str, value: f64, labels: &[(&str, &str)]) -> Result<(), MetricsError> {
        self.exporter.observe_histogram(name, value, labels).await
    }

    pub async fn export(&self) -> Result<Vec<u8>, MetricsError> {
        self.exporter.export().await
    }

    // Convenience methods for workflow metrics

    /// Record that a run was accepted
    pub async fn record_run_started(&self, language: &str) {
        log_failure(self.increment("caption_runs_started_total", &[("language", language)]).await);
    }

    /// Record how a run ended ("succeeded", "failed", "rejected", "cancelled") and how long it took
    pub async fn record_run_finished(&self, language: &str, outcome: &str, duration_secs: f64) {
        let labels = [("language", language), ("outcome", outcome)];
        log_failure(self.increment("caption_runs_finished_total", &labels).await);
        log_failure(
            self.observe_histogram("caption_run_duration_seconds", duration_secs, &labels)
                .await,
        );
    }

    /// Record a `start` refused because a run was in flight
    pub async fn record_start_rejected(&self) {
        log_failure(self.increment("caption_runs_rejected_total", &[]).await);
    }

    /// Record the size of the last audio payload received
    pub async fn record_audio_payload(&self, size_bytes: usize) {
        log_failure(self.set_gauge("caption_audio_payload_bytes", size_bytes as f64, &[]).await);
    }

    /// Record the number of audio handles currently live
    pub async fn set_live_audio_handles(&self, count: usize) {
        log_failure(self.set_gauge("caption_live_audio_handles", count as f64, &[]).await);
    }
}

fn log_failure(result: Result<(), MetricsError>) {
    if let Err(e) = result {
        warn!("Failed to record metric: {}", e);
    }
}

/// Factory function to create metrics exporter based on configuration
pub fn create_metrics_exporter(exporter_type: &str) -> Arc<dyn MetricsExporter> {
    match exporter_type.to_lowercase().as_str() {
        "prometheus" => {
            debug!("Initializing Prometheus metrics exporter");
            Arc::new(PrometheusExporter::new())
        }
        "none" | "disabled" | "" => {
            debug!("Metrics disabled, using null exporter");
            create_null_exporter()
        }
        _ => {
            warn!("Unknown metrics exporter type '{}', using null exporter", exporter_type);
            create_null_exporter()
        }
    }
}

pub fn create_prometheus_exporter() -> Arc<dyn MetricsExporter> {
    Arc::new(PrometheusExporter::new())
}

pub fn create_null_exporter() -> Arc<dyn MetricsExporter> {
    Arc::new(NullExporter)
}
