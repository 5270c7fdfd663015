// Caption client metrics
//
// This module contains the metrics for the caption client.
// It tracks workflow runs and audio handles through a pluggable exporter.

pub mod error;
pub mod metrics;
pub mod null;
pub mod prometheus;

#[cfg(test)]
mod tests;

pub use self::error::MetricsError;
pub use self::metrics::{
    create_metrics_exporter, create_null_exporter, create_prometheus_exporter, Metrics, MetricsExporter,
};
