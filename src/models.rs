// Caption client data models
//
// This module contains the request and result contracts of the caption service,
// and the wire payload the service answers with.

use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// File name sent with the image when the caller does not give one
pub const DEFAULT_IMAGE_FILE_NAME: &str = "image";

/// Input of the caption-and-translate call
#[derive(Debug, Clone, Default)]
pub struct CaptionRequest {
    /// Raw image bytes, uploaded as-is
    pub image_bytes: Vec<u8>,
    /// Target language code (e.g., "fr", "zh-cn"), passed through unvalidated
    pub target_language: String,
    /// File name of the multipart part
    pub file_name: Option<String>,
}

impl CaptionRequest {
    pub fn new<L: Into<String>>(image_bytes: Vec<u8>, target_language: L) -> Self {
        Self {
            image_bytes,
            target_language: target_language.into(),
            file_name: None,
        }
    }

    pub fn with_file_name<S: Into<String>>(mut self, file_name: S) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn file_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or(DEFAULT_IMAGE_FILE_NAME)
    }
}

/// Outcome of a caption-and-translate exchange that completed at the transport level
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptionResult {
    /// The service produced both captions
    Captioned {
        original_caption: String,
        translated_caption: String,
    },
    /// The service reported an application-level error (e.g. unreadable image)
    Rejected { error_message: String },
}

/// Body of `POST /caption/`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TryFrom<CaptionResponse> for CaptionResult {
    type Error = TransportError;

    /// A non-empty `error` wins; otherwise both captions must be present.
    fn try_from(response: CaptionResponse) -> Result<Self, Self::Error> {
        if let Some(error_message) = response.error.filter(|e| !e.is_empty()) {
            return Ok(CaptionResult::Rejected { error_message });
        }

        match (response.original_caption, response.translated_caption) {
            (Some(original_caption), Some(translated_caption)) => Ok(CaptionResult::Captioned {
                original_caption,
                translated_caption,
            }),
            (None, _) => Err(TransportError::decode("response is missing original_caption")),
            (_, None) => Err(TransportError::decode("response is missing translated_caption")),
        }
    }
}
