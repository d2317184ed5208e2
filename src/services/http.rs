//! HTTP-backed collaborator implementations.
//!
//! Both services speak the OpenAI-compatible wire shape, which nearly every
//! hosted and self-hosted inference gateway accepts today. The base URL is
//! configurable so LM Studio, vLLM, or a corporate proxy work unchanged;
//! only the path suffix (`chat/completions`, `audio/transcriptions`)
//! is fixed.

use async_trait::async_trait;
use base64::Engine as _;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use super::{ServiceError, SpeechToText, VisionService};

fn client(timeout_secs: u64) -> Result<reqwest::Client, ServiceError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ServiceError::Http(e.to_string()))
}

/// Vision/caption/OCR client for an OpenAI-compatible `chat/completions`
/// endpoint. The image travels inline as a base64 `data:` URL.
pub struct OpenAiVisionService {
    base_url: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
    max_tokens: u32,
}

impl OpenAiVisionService {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            timeout_secs: 120,
            max_tokens: 16384,
        }
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

#[async_trait]
impl VisionService for OpenAiVisionService {
    async fn analyze(&self, image: &Path, prompt: &str) -> Result<String, ServiceError> {
        let bytes = tokio::fs::read(image).await?;
        let mime = match image.extension().and_then(|e| e.to_str()) {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            _ => "image/png",
        };
        let data_url = format!(
            "data:{};base64,{}",
            mime,
            base64::engine::general_purpose::STANDARD.encode(&bytes)
        );

        let payload = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    { "type": "image_url", "image_url": { "url": data_url } }
                ],
            }],
            "max_tokens": self.max_tokens,
        });

        debug!(model = %self.model, image = %image.display(), "vision request");
        let response = client(self.timeout_secs)?
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ServiceError::Http(e.to_string()))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| ServiceError::Http(e.to_string()))?;

        if let Some(err) = body.get("error") {
            return Err(ServiceError::UnexpectedResponse(err.to_string()));
        }
        body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| ServiceError::UnexpectedResponse(body.to_string()))
    }
}

/// Speech-to-text client for an OpenAI-compatible `audio/transcriptions`
/// endpoint (multipart upload, plain-text response).
pub struct OpenAiSpeechService {
    base_url: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
}

impl OpenAiSpeechService {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            timeout_secs: 300,
        }
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

#[async_trait]
impl SpeechToText for OpenAiSpeechService {
    async fn transcribe(&self, audio: &Path) -> Result<String, ServiceError> {
        let bytes = tokio::fs::read(audio).await?;
        let filename = audio
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());

        let form = reqwest::multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", "text")
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(filename),
            );

        debug!(model = %self.model, audio = %audio.display(), "transcription request");
        let response = client(self.timeout_secs)?
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ServiceError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ServiceError::Http(format!(
                "HTTP {} from transcription endpoint",
                response.status()
            )));
        }
        response
            .text()
            .await
            .map_err(|e| ServiceError::Http(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let svc = OpenAiVisionService::new("http://localhost:1234/v1/", "key", "m");
        assert_eq!(svc.base_url, "http://localhost:1234/v1");
    }
}
