// HTTP client for the caption service
//
// POST {endpoint}/caption/?lang=<code>  multipart image under field `file`
// GET  {endpoint}/audio                 raw audio bytes

use async_trait::async_trait;
use log::{debug, info};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use std::time::Duration;

use super::CaptionService;
use crate::config::ClientConfig;
use crate::error::{ConfigError, TransportError};
use crate::models::{CaptionRequest, CaptionResponse, CaptionResult};

/// Multipart field carrying the image
pub const IMAGE_FIELD: &str = "file";

/// `CaptionService` over HTTP
#[derive(Debug, Clone)]
pub struct HttpCaptionService {
    client: Client,
    endpoint: String,
}

impl HttpCaptionService {
    /// Create a client for the endpoint and timeout in `config`
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn caption_url(&self) -> String {
        format!("{}/caption/", self.endpoint)
    }

    fn audio_url(&self) -> String {
        format!("{}/audio", self.endpoint)
    }
}

/// Pass 2xx responses through, turn anything else into `TransportError::Status`
async fn ensure_success(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TransportError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl CaptionService for HttpCaptionService {
    async fn caption_and_translate(&self, request: CaptionRequest) -> Result<CaptionResult, TransportError> {
        let url = self.caption_url();
        let file_name = request.file_name().to_string();
        debug!(
            "Uploading {} ({} bytes) to {} for language {}",
            file_name,
            request.image_bytes.len(),
            url,
            request.target_language
        );

        let form = Form::new().part(IMAGE_FIELD, Part::bytes(request.image_bytes).file_name(file_name));
        let response = self
            .client
            .post(&url)
            .query(&[("lang", request.target_language.as_str())])
            .multipart(form)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let body = response.bytes().await?;
        let payload: CaptionResponse = serde_json::from_slice(&body)?;
        let result = CaptionResult::try_from(payload)?;

        match &result {
            CaptionResult::Captioned { .. } => info!("Caption received for language {}", request.target_language),
            CaptionResult::Rejected { error_message } => info!("Caption service rejected image: {}", error_message),
        }
        Ok(result)
    }

    async fn fetch_audio(&self) -> Result<Vec<u8>, TransportError> {
        let url = self.audio_url();
        debug!("Fetching audio from {}", url);

        let response = self.client.get(&url).send().await?;
        let response = ensure_success(response).await?;
        let payload = response.bytes().await?;

        info!("Audio received: {} bytes", payload.len());
        Ok(payload.to_vec())
    }
}
