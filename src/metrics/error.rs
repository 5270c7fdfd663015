//! Error types for the metrics system

use thiserror::Error;

/// Errors raised by metric exporters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricsError {
    /// Invalid metric name (empty, wrong first character, invalid characters)
    #[error("Invalid metric name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Invalid label name
    #[error("Invalid label '{label}': {reason}")]
    InvalidLabel { label: String, reason: String },

    /// Metric registration failed (e.g., same name registered with other labels)
    #[error("Failed to register metric '{name}': {reason}")]
    RegistrationFailed { name: String, reason: String },

    /// Metric export failed
    #[error("Failed to export metrics: {reason}")]
    ExportFailed { reason: String },
}

impl MetricsError {
    pub fn invalid_name<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_label<L: Into<String>, R: Into<String>>(label: L, reason: R) -> Self {
        Self::InvalidLabel {
            label: label.into(),
            reason: reason.into(),
        }
    }

    pub fn registration_failed<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        Self::RegistrationFailed {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn export_failed<R: Into<String>>(reason: R) -> Self {
        Self::ExportFailed {
            reason: reason.into(),
        }
    }
}

/// Prometheus naming rules
pub mod validation {
    use super::MetricsError;

    /// Reserved label names
    const RESERVED_LABELS: &[&str] = &["__name__", "__value__"];

    /// Metric names start with a letter or underscore and contain only
    /// letters, digits, underscores and colons.
    pub fn validate_metric_name(name: &str) -> Result<(), MetricsError> {
        let mut chars = name.chars();
        match chars.next() {
            None => return Err(MetricsError::invalid_name(name, "Metric name cannot be empty")),
            Some(first) if !(first.is_ascii_alphabetic() || first == '_') => {
                return Err(MetricsError::invalid_name(
                    name,
                    "Metric name must start with a letter or underscore",
                ))
            }
            Some(_) => {}
        }

        if let Some((i, ch)) = name
            .chars()
            .enumerate()
            .find(|(_, ch)| !(ch.is_ascii_alphanumeric() || *ch == '_' || *ch == ':'))
        {
            return Err(MetricsError::invalid_name(
                name,
                format!("Invalid character '{}' at position {}", ch, i),
            ));
        }
        Ok(())
    }

    /// Label keys follow metric naming rules minus colons, and must not be reserved
    pub fn validate_label_key(key: &str) -> Result<(), MetricsError> {
        if key.is_empty() {
            return Err(MetricsError::invalid_label(key, "Label key cannot be empty"));
        }
        if RESERVED_LABELS.contains(&key) {
            return Err(MetricsError::invalid_label(key, "Label key is reserved by Prometheus"));
        }
        let valid = key.chars().enumerate().all(|(i, ch)| {
            ch == '_' || ch.is_ascii_alphabetic() || (i > 0 && ch.is_ascii_digit())
        });
        if !valid {
            return Err(MetricsError::invalid_label(key, "Label key contains invalid characters"));
        }
        Ok(())
    }

    pub fn validate_labels(labels: &[(&str, &str)]) -> Result<(), MetricsError> {
        labels.iter().try_for_each(|(key, _)| validate_label_key(key))
    }

}
