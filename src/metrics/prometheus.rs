/// Prometheus metrics exporter implementation
///
/// Metrics are created on first use and registered in a private registry,
/// which `export` renders in the Prometheus text format.
use crate::metrics::error::{validation, MetricsError};
use crate::metrics::metrics::MetricsExporter;
use async_trait::async_trait;
use log::{debug, warn};
use prometheus::{CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Buckets for run durations, in seconds. Captioning plus TTS is slow.
const DURATION_BUCKETS: &[f64] = &[0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0];

/// Prometheus implementation of MetricsExporter
pub struct PrometheusExporter {
    registry: Registry,
    namespace: Option<String>,
    counters: Mutex<HashMap<String, CounterVec>>,
    gauges: Mutex<HashMap<String, GaugeVec>>,
    histograms: Mutex<HashMap<String, HistogramVec>>,
}

impl Default for PrometheusExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl PrometheusExporter {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            namespace: None,
            counters: Mutex::new(HashMap::new()),
            gauges: Mutex::new(HashMap::new()),
            histograms: Mutex::new(HashMap::new()),
        }
    }

    /// Create an exporter whose metric names are prefixed with `namespace_`
    pub fn with_namespace<S: Into<String>>(namespace: S) -> Result<Self, MetricsError> {
        let namespace = namespace.into();
        validation::validate_metric_name(&namespace)?;
        Ok(Self {
            namespace: Some(namespace),
            ..Self::new()
        })
    }

    fn full_name(&self, name: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{}_{}", ns, name),
            None => name.to_string(),
        }
    }

    fn register<C>(&self, name: &str, collector: C) -> Result<C, MetricsError>
    where
        C: prometheus::core::Collector + Clone + 'static,
    {
        self.registry
            .register(Box::new(collector.clone()))
            .map_err(|e| MetricsError::registration_failed(name, e.to_string()))?;
        Ok(collector)
    }

    async fn get_or_create_counter(&self, name: &str, label_names: &[&str]) -> Result<CounterVec, MetricsError> {
        let mut counters = self.counters.lock().await;
        if let Some(counter) = counters.get(name) {
            return Ok(counter.clone());
        }

        let counter = CounterVec::new(Opts::new(self.full_name(name), "Counter metric"), label_names)
            .map_err(|e| MetricsError::registration_failed(name, e.to_string()))?;
        let counter = self.register(name, counter)?;
        counters.insert(name.to_string(), counter.clone());
        Ok(counter)
    }

    async fn get_or_create_gauge(&self, name: &str, label_names: &[&str]) -> Result<GaugeVec, MetricsError> {
        let mut gauges = self.gauges.lock().await;
        if let Some(gauge) = gauges.get(name) {
            return Ok(gauge.clone());
        }

        let gauge = GaugeVec::new(Opts::new(self.full_name(name), "Gauge metric"), label_names)
            .map_err(|e| MetricsError::registration_failed(name, e.to_string()))?;
        let gauge = self.register(name, gauge)?;
        gauges.insert(name.to_string(), gauge.clone());
        Ok(gauge)
    }

    async fn get_or_create_histogram(&self, name: &str, label_names: &[&str]) -> Result<HistogramVec, MetricsError> {
        let mut histograms = self.histograms.lock().await;
        if let Some(histogram) = histograms.get(name) {
            return Ok(histogram.clone());
        }

        let opts = HistogramOpts::new(self.full_name(name), "Histogram metric").buckets(DURATION_BUCKETS.to_vec());
        let histogram =
            HistogramVec::new(opts, label_names).map_err(|e| MetricsError::registration_failed(name, e.to_string()))?;
        let histogram = self.register(name, histogram)?;
        histograms.insert(name.to_string(), histogram.clone());
        Ok(histogram)
    }

    fn split_labels<'a>(labels: &'a [(&'a str, &'a str)]) -> (Vec<&'a str>, Vec<&'a str>) {
        labels.iter().map(|(k, v)| (*k, *v)).unzip()
    }

    fn validate(name: &str, labels: &[(&str, &str)]) -> Result<(), MetricsError> {
        validation::validate_metric_name(name)?;
        validation::validate_labels(labels)
    }
}

#[async_trait]
impl MetricsExporter for PrometheusExporter {
    async fn increment(&self, name: &str, labels: &[(&str, &str)]) -> Result<(), MetricsError> {
        Self::validate(name, labels)?;
        let (label_names, label_values) = Self::split_labels(labels);
        let counter = self.get_or_create_counter(name, &label_names).await?;
        counter
            .get_metric_with_label_values(label_values.as_slice())
            .map_err(|e| MetricsError::invalid_label(name, e.to_string()))?
            .inc();

        debug!("Incremented counter {} with labels {:?}", name, labels);
        Ok(())
    }

    async fn set_gauge(&self, name: &str, value: f64, labels: &[(&str, &str)]) -> Result<(), MetricsError> {
        Self::validate(name, labels)?;
        let (label_names, label_values) = Self::split_labels(labels);
        let gauge = self.get_or_create_gauge(name, &label_names).await?;
        gauge
            .get_metric_with_label_values(label_values.as_slice())
            .map_err(|e| MetricsError::invalid_label(name, e.to_string()))?
            .set(value);

        debug!("Set gauge {} to {} with labels {:?}", name, value, labels);
        Ok(())
    }

    async fn observe_histogram(&self, name: &str, value: f64, labels: &[(&str, &str)]) -> Result<(), MetricsError> {
        Self::validate(name, labels)?;
        if !value.is_finite() {
            warn!("Dropping non-finite observation for histogram {}", name);
            return Ok(());
        }
        let (label_names, label_values) = Self::split_labels(labels);
        let histogram = self.get_or_create_histogram(name, &label_names).await?;
        histogram
            .get_metric_with_label_values(label_values.as_slice())
            .map_err(|e| MetricsError::invalid_label(name, e.to_string()))?
            .observe(value);

        debug!("Observed histogram {} with value {} and labels {:?}", name, value, labels);
        Ok(())
    }

    async fn export(&self) -> Result<Vec<u8>, MetricsError> {
        let mut buffer = vec![];
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| MetricsError::export_failed(e.to_string()))?;
        Ok(buffer)
    }
}
