use crate::metrics::error::MetricsError;
use crate::metrics::metrics::MetricsExporter;
use async_trait::async_trait;

/// Null exporter for testing or when metrics are disabled
pub struct NullExporter;

#[async_trait]
impl MetricsExporter for NullExporter {
    async fn increment(&self, _name: &str, _labels: &[(&str, &str)]) -> Result<(), MetricsError> {
        Ok(())
    }

    async fn set_gauge(&self, _name: &str, _value: f64, _labels: &[(&str, &str)]) -> Result<(), MetricsError> {
        Ok(())
    }

    async fn observe_histogram(&self, _name: &str, _value: f64, _labels: &[(&str, &str)]) -> Result<(), MetricsError> {
        Ok(())
    }

    async fn export(&self) -> Result<Vec<u8>, MetricsError> {
        Ok(vec![])
    }
}
