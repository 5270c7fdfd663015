// Caption Client Library
//
// This crate drives an image captioning service from the client side: upload an image,
// receive its caption and translation, then fetch and materialize the spoken translation.
// It exposes a single-run workflow state machine for presentation layers to render.

pub mod audio;
pub mod caption_service;
pub mod config;
pub mod config_loader;
pub mod error;
pub mod file_utils;
pub mod metrics;
pub mod models;
pub mod orchestrator;

// Re-export common types for easier access
pub use audio::{AudioHandle, AudioResourceManager, LiveAudio, TempDirAudioStore};
pub use caption_service::{CaptionService, HttpCaptionService};
pub use config::{ClientConfig, MetricsConfig};
pub use error::{AudioError, ConfigError, TransportError, WorkflowError};
pub use metrics::Metrics;
pub use models::{CaptionRequest, CaptionResult};
pub use orchestrator::{WorkflowOrchestrator, WorkflowState, GENERIC_FAILURE_MESSAGE};
