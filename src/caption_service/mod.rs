// Caption service contract
//
// This module defines the two remote operations the workflow depends on.
// The HTTP implementation lives in `http`; tests substitute their own.

pub mod http;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::models::{CaptionRequest, CaptionResult};

pub use self::http::HttpCaptionService;

/// Remote captioning, translation and speech synthesis
///
/// Each call is a single exchange. Implementations never retry and never swallow a failure.
#[async_trait]
pub trait CaptionService: Send + Sync {
    /// Upload an image and get its caption plus a translation into `request.target_language`.
    ///
    /// A service-reported error is `Ok(CaptionResult::Rejected)`; `Err` is reserved
    /// for transport failures.
    async fn caption_and_translate(&self, request: CaptionRequest) -> Result<CaptionResult, TransportError>;

    /// Fetch the speech rendering of the most recently produced caption.
    ///
    /// The service resolves "most recent" from its own session state.
    async fn fetch_audio(&self) -> Result<Vec<u8>, TransportError>;
}
