//! OpenAI image generation client (DALL-E 3).
//!
//! The API answers with a short-lived URL; the image is downloaded from it
//! with the same client and timeout.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::{ArtifactSource, GenerationBackend};
use crate::certificate::ArtifactKind;
use crate::error::{ConfigurationError, GenerationError};
use crate::http_client::{build_client, error_message, HttpConfig};

const DEFAULT_API_URL: &str = "https://api.openai.com";
const MODEL: &str = "dall-e-3";
const IMAGE_SIZE: &str = "1024x1024";

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
    response_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    url: Option<String>,
}

/// Configuration for the OpenAI client.
#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OpenAiConfig {
    pub fn new(api_key: &str, timeout: Duration) -> Self {
        Self {
            api_url: std::env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            api_key: api_key.to_string(),
            timeout,
        }
    }
}

/// OpenAI DALL-E image generation client.
pub struct OpenAiImageSource {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiImageSource {
    #[instrument(level = "debug", skip_all, fields(api_url = %config.api_url))]
    pub fn new(config: OpenAiConfig) -> Result<Self, ConfigurationError> {
        let client =
            build_client(&HttpConfig::new(config.timeout, true)).map_err(ConfigurationError)?;
        debug!("OpenAI image client created");
        Ok(Self { client, config })
    }

    fn request_error(&self, e: reqwest::Error) -> GenerationError {
        if e.is_timeout() {
            GenerationError::Timeout {
                secs: self.config.timeout.as_secs(),
            }
        } else {
            GenerationError::Upstream(format!("Failed to generate image: {e}"))
        }
    }

    fn image_url(response: ImageResponse) -> Result<String, GenerationError> {
        response
            .data
            .into_iter()
            .next()
            .and_then(|d| d.url)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| GenerationError::EmptyResult("No image URL returned".into()))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, GenerationError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        if !response.status().is_success() {
            return Err(GenerationError::Upstream(format!(
                "Failed to download generated image: HTTP {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.request_error(e))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ArtifactSource for OpenAiImageSource {
    #[instrument(level = "info", skip(self, prompt), fields(source = "openai", prompt_len = prompt.len()))]
    async fn generate(
        &self,
        prompt: &str,
        _kind: ArtifactKind,
    ) -> Result<Vec<u8>, GenerationError> {
        let start = Instant::now();
        let request = ImageRequest {
            model: MODEL,
            prompt,
            n: 1,
            size: IMAGE_SIZE,
            response_format: "url",
        };

        let response = self
            .client
            .post(format!(
                "{}/v1/images/generations",
                self.config.api_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "OpenAI request failed");
                self.request_error(e)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let message = error_message(response).await;
            warn!(status = %status, error = %message, "OpenAI returned an error");
            return Err(GenerationError::Upstream(format!("OpenAI error: {message}")));
        }

        let parsed: ImageResponse = response.json().await.map_err(|e| {
            GenerationError::Upstream(format!("Failed to parse OpenAI response: {e}"))
        })?;

        let url = Self::image_url(parsed)?;
        let bytes = self.download(&url).await?;

        info!(
            bytes = bytes.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Image generated"
        );
        Ok(bytes)
    }

    fn backend(&self) -> GenerationBackend {
        GenerationBackend::OpenAi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = ImageRequest {
            model: MODEL,
            prompt: "a red cube",
            n: 1,
            size: IMAGE_SIZE,
            response_format: "url",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "dall-e-3");
        assert_eq!(json["size"], "1024x1024");
        assert_eq!(json["response_format"], "url");
    }

    #[test]
    fn test_image_url_extracted() {
        let response: ImageResponse =
            serde_json::from_str(r#"{"created":1,"data":[{"url":"https://img.example/x.png"}]}"#)
                .unwrap();
        assert_eq!(
            OpenAiImageSource::image_url(response).unwrap(),
            "https://img.example/x.png"
        );
    }

    #[test]
    fn test_missing_url_is_empty_result() {
        let response: ImageResponse = serde_json::from_str(r#"{"data":[{}]}"#).unwrap();
        let err = OpenAiImageSource::image_url(response).unwrap_err();
        assert!(matches!(err, GenerationError::EmptyResult(_)));
        assert_eq!(err.to_string(), "No image URL returned");
    }
}
