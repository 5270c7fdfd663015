// Error handling for the caption client
//
// This module defines the error types for each concern of the client:
// the network exchange, local audio materialization, the workflow trigger and configuration.

use std::io;
use thiserror::Error;

/// Failures to complete an exchange with the caption service.
///
/// Application-level errors reported by the service are not transport errors;
/// they arrive as `CaptionResult::Rejected`.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection refused, DNS failure, timeout or broken body stream
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-2xx response
    #[error("Service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// 2xx response whose body is not the expected payload
    #[error("Malformed response: {0}")]
    Decode(String),
}

impl TransportError {
    /// Create a new Decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// True when the service answered, but not with 2xx
    pub fn is_status(&self) -> bool {
        matches!(self, Self::Status { .. })
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Decode(err.to_string())
    }
}

/// Failures of the local audio store
#[derive(Error, Debug)]
pub enum AudioError {
    /// Error while writing the payload to disk
    #[error("Audio file error: {0}")]
    Io(#[from] io::Error),
}

/// Reasons a workflow run is refused before it starts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// A run is already in flight for this orchestrator
    #[error("A caption request is already running")]
    AlreadyRunning,

    /// No image bytes were supplied
    #[error("No image provided")]
    NoImage,
}

/// Invalid client configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Endpoint is not an http(s) URL
    #[error("Invalid API endpoint '{0}': expected an http:// or https:// URL")]
    InvalidEndpoint(String),

    /// Zero request timeout
    #[error("Request timeout must be greater than zero")]
    InvalidTimeout,

    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}
