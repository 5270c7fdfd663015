// Caption client configuration
//
// This module contains configuration structures and constants for the caption client.
// It centralizes all configuration parameters and provides defaults from environment variables.

use std::env;
use std::path::PathBuf;

use crate::error::ConfigError;

/// Default values for configuration
pub mod defaults {
    // Base endpoint of the caption/translation/speech service
    pub const API_URL: &str = "http://localhost:8000";

    // Default target language for captions
    pub const LANGUAGE: &str = "en";

    // Timeout in seconds applied to each remote call
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 120;

    // Folder created under the system temp dir for materialized audio
    pub const AUDIO_DIR_NAME: &str = "caption_audio";

    // Languages offered by the reference frontend. Informational only, never enforced.
    pub const KNOWN_LANGUAGES: [(&str, &str); 7] = [
        ("en", "English"),
        ("es", "Spanish"),
        ("fr", "French"),
        ("de", "German"),
        ("hi", "Hindi"),
        ("ja", "Japanese"),
        ("zh-cn", "Chinese (Simplified)"),
    ];
}

// Environment variable names
pub const ENV_API_URL: &str = "CAPTION_API_URL";
pub const ENV_REQUEST_TIMEOUT: &str = "CAPTION_REQUEST_TIMEOUT_SECONDS";
pub const ENV_AUDIO_DIR: &str = "CAPTION_AUDIO_DIR";
pub const ENV_DEFAULT_LANGUAGE: &str = "CAPTION_DEFAULT_LANGUAGE";
pub const ENV_METRICS_BACKEND: &str = "CAPTION_METRICS_BACKEND";

/// Configuration for the caption service client and the audio store
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base endpoint, without trailing slash
    pub api_url: String,
    /// Timeout in seconds for each request
    pub request_timeout: u64,
    /// Directory where audio payloads are materialized
    pub audio_dir: PathBuf,
    /// Language used when the caller does not pick one
    pub default_language: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_source(|key| env::var(key).ok())
    }
}

impl ClientConfig {
    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// `Default` uses the process environment; tests pass a closure over a map.
    pub fn from_source<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup(ENV_API_URL)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| String::from(defaults::API_URL));

        Self {
            api_url: normalize_endpoint(&api_url),
            request_timeout: lookup(ENV_REQUEST_TIMEOUT)
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults::REQUEST_TIMEOUT_SECONDS),
            audio_dir: lookup(ENV_AUDIO_DIR)
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| env::temp_dir().join(defaults::AUDIO_DIR_NAME)),
            default_language: lookup(ENV_DEFAULT_LANGUAGE)
                .map(|lang| lang.trim().to_string())
                .filter(|lang| !lang.is_empty())
                .unwrap_or_else(|| String::from(defaults::LANGUAGE)),
        }
    }

    /// Rejects settings the client cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(ConfigError::InvalidEndpoint(self.api_url.clone()));
        }
        if self.request_timeout == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(())
    }

    /// Human-readable name of a language code, if the reference frontend lists it
    pub fn language_label(code: &str) -> Option<&'static str> {
        defaults::KNOWN_LANGUAGES
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(code))
            .map(|(_, label)| *label)
    }

    /// Ensures the audio directory exists
    pub fn ensure_audio_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.audio_dir)
    }
}

/// Configuration for metrics collection and export
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    /// Type of metrics exporter ("prometheus", "none", "disabled")
    pub exporter_type: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            exporter_type: env::var(ENV_METRICS_BACKEND).unwrap_or_else(|_| "none".to_string()),
        }
    }
}

fn normalize_endpoint(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
