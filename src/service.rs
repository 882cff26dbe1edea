//! Client for the remote captioning service.
//!
//! The service takes `POST <base>/generate` as multipart form data with the
//! fields `image`, `type`, `language` and optionally `details`, and answers
//! with one of `{caption}`, `{captions: [...]}` or `{error}`.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::CaptionError;
use crate::render::{CaptionEntry, CaptionResult};

/// The image as it is sent to the service.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone)]
pub struct CaptionRequest {
    pub image: ImageUpload,
    pub style: String,
    pub language: String,
    pub details: Option<String>,
}

impl CaptionRequest {
    /// Multipart fields in the order they are sent. `details` is left out
    /// when absent.
    pub fn text_fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = vec![("type", self.style.as_str()), ("language", self.language.as_str())];
        if let Some(details) = &self.details {
            fields.push(("details", details.as_str()));
        }
        fields
    }
}

/// Something that turns a caption request into captions.
#[async_trait]
pub trait CaptionService: Send + Sync {
    async fn generate(&self, request: &CaptionRequest) -> Result<CaptionResult, CaptionError>;
}

/// Talks to the captioning service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCaptionService {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpCaptionService {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            endpoint: format!("{}/generate", base_url.trim_end_matches('/')),
            client: builder.build()?,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn form(request: &CaptionRequest) -> Result<Form, CaptionError> {
        let image = Part::bytes(request.image.bytes.to_vec())
            .file_name(request.image.file_name.clone())
            .mime_str(&request.image.mime)
            .map_err(|e| CaptionError::NetworkFailure(format!("invalid image type: {}", e)))?;

        let mut form = Form::new().part("image", image);
        for (name, value) in request.text_fields() {
            form = form.text(name, value.to_string());
        }
        Ok(form)
    }
}

#[async_trait]
impl CaptionService for HttpCaptionService {
    async fn generate(&self, request: &CaptionRequest) -> Result<CaptionResult, CaptionError> {
        tracing::info!(
            endpoint = %self.endpoint,
            style = %request.style,
            language = %request.language,
            "📤 sending caption request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(Self::form(request)?)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(%status, body = %excerpt(&body), "caption service response");

        let result = parse_response(status, &body);
        match &result {
            Ok(captions) => tracing::info!(count = captions.len(), "✅ captions received"),
            Err(e) => tracing::warn!("caption request failed: {}", e),
        }
        result
    }
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    caption: Option<String>,
    captions: Option<Vec<RawEntry>>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Text(String),
    Tagged {
        caption: String,
        #[serde(default)]
        hashtags: Option<String>,
    },
}

impl From<RawEntry> for CaptionEntry {
    fn from(raw: RawEntry) -> Self {
        match raw {
            RawEntry::Text(caption) => CaptionEntry::plain(caption),
            RawEntry::Tagged { caption, hashtags } => {
                CaptionEntry::new(caption, hashtags.unwrap_or_default())
            }
        }
    }
}

/// Interpret a response from the service.
///
/// Captions win over everything else, even on a non-2xx status: some
/// servers report their own failures as a caption. Otherwise an `error`
/// field or a failing status is a server error, and anything else is
/// malformed.
pub fn parse_response(status: StatusCode, body: &str) -> Result<CaptionResult, CaptionError> {
    let raw: RawResponse = match serde_json::from_str(body) {
        Ok(raw) => raw,
        Err(e) if status.is_success() => {
            return Err(CaptionError::MalformedResponse(format!("invalid JSON: {}", e)))
        }
        Err(_) => {
            return Err(CaptionError::ServerError(format!(
                "HTTP {}: {}",
                status,
                excerpt(body)
            )))
        }
    };

    if let Some(captions) = raw.captions {
        return Ok(CaptionResult(captions.into_iter().map(CaptionEntry::from).collect()));
    }
    if let Some(caption) = raw.caption {
        return Ok(CaptionResult(vec![CaptionEntry::plain(caption)]));
    }
    if let Some(error) = raw.error {
        return Err(CaptionError::ServerError(error));
    }
    if !status.is_success() {
        return Err(CaptionError::ServerError(format!("HTTP {}", status)));
    }
    Err(CaptionError::MalformedResponse(
        "response has no caption or captions".to_string(),
    ))
}

fn excerpt(body: &str) -> &str {
    match body.char_indices().nth(500) {
        Some((end, _)) => &body[..end],
        None => body,
    }
}
