//! Stability AI text-to-image client (SDXL 1.0).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::{ArtifactSource, GenerationBackend};
use crate::certificate::ArtifactKind;
use crate::error::{ConfigurationError, GenerationError};
use crate::http_client::{build_client, error_message, HttpConfig};

/// Default Stability AI API base.
const DEFAULT_API_URL: &str = "https://api.stability.ai";

/// SDXL 1.0 engine identifier.
const ENGINE_ID: &str = "stable-diffusion-xl-1024-v1-0";

const CFG_SCALE: f32 = 7.0;
const IMAGE_SIZE: u32 = 1024;
const STEPS: u32 = 30;

#[derive(Debug, Serialize)]
struct TextPrompt<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct TextToImageRequest<'a> {
    text_prompts: [TextPrompt<'a>; 1],
    cfg_scale: f32,
    height: u32,
    width: u32,
    steps: u32,
    samples: u32,
}

#[derive(Debug, Deserialize)]
struct TextToImageResponse {
    #[serde(default)]
    artifacts: Vec<GeneratedArtifact>,
}

#[derive(Debug, Deserialize)]
struct GeneratedArtifact {
    #[serde(default)]
    base64: Option<String>,
}

/// Configuration for the Stability AI client.
#[derive(Clone)]
pub struct StabilityConfig {
    /// API base URL (without the engine path)
    pub api_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for StabilityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StabilityConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl StabilityConfig {
    pub fn new(api_key: &str, timeout: Duration) -> Self {
        Self {
            api_url: std::env::var("STABILITY_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            api_key: api_key.to_string(),
            timeout,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/generation/{ENGINE_ID}/text-to-image",
            self.api_url.trim_end_matches('/')
        )
    }
}

/// Stability AI image generation client.
pub struct StabilityImageSource {
    client: Client,
    config: StabilityConfig,
}

impl StabilityImageSource {
    #[instrument(level = "debug", skip_all, fields(api_url = %config.api_url))]
    pub fn new(config: StabilityConfig) -> Result<Self, ConfigurationError> {
        let client =
            build_client(&HttpConfig::new(config.timeout, true)).map_err(ConfigurationError)?;
        debug!("Stability AI client created");
        Ok(Self { client, config })
    }

    fn decode_artifact(response: TextToImageResponse) -> Result<Vec<u8>, GenerationError> {
        let encoded = response
            .artifacts
            .into_iter()
            .next()
            .and_then(|a| a.base64)
            .filter(|b| !b.is_empty())
            .ok_or_else(|| {
                GenerationError::EmptyResult("No image returned from Stability AI".into())
            })?;

        BASE64.decode(encoded).map_err(|e| {
            GenerationError::Upstream(format!("Stability AI returned invalid base64: {e}"))
        })
    }
}

#[async_trait]
impl ArtifactSource for StabilityImageSource {
    #[instrument(level = "info", skip(self, prompt), fields(source = "stability", prompt_len = prompt.len()))]
    async fn generate(
        &self,
        prompt: &str,
        _kind: ArtifactKind,
    ) -> Result<Vec<u8>, GenerationError> {
        let start = Instant::now();
        let request = TextToImageRequest {
            text_prompts: [TextPrompt { text: prompt }],
            cfg_scale: CFG_SCALE,
            height: IMAGE_SIZE,
            width: IMAGE_SIZE,
            steps: STEPS,
            samples: 1,
        };

        let response = self
            .client
            .post(self.config.endpoint())
            .bearer_auth(&self.config.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, latency_ms = start.elapsed().as_millis() as u64, "Stability AI request failed");
                if e.is_timeout() {
                    GenerationError::Timeout {
                        secs: self.config.timeout.as_secs(),
                    }
                } else {
                    GenerationError::Upstream(format!(
                        "Failed to generate image with Stability AI: {e}"
                    ))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let message = error_message(response).await;
            warn!(status = %status, error = %message, "Stability AI returned an error");
            return Err(GenerationError::Upstream(format!(
                "Stability AI error: {message}"
            )));
        }

        let parsed: TextToImageResponse = response.json().await.map_err(|e| {
            GenerationError::Upstream(format!("Failed to parse Stability AI response: {e}"))
        })?;

        let bytes = Self::decode_artifact(parsed)?;
        info!(
            bytes = bytes.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Image generated"
        );
        Ok(bytes)
    }

    fn backend(&self) -> GenerationBackend {
        GenerationBackend::StabilityAi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_includes_engine() {
        let config = StabilityConfig {
            api_url: "https://api.stability.ai/".into(),
            api_key: "k".into(),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(
            config.endpoint(),
            "https://api.stability.ai/v1/generation/stable-diffusion-xl-1024-v1-0/text-to-image"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let request = TextToImageRequest {
            text_prompts: [TextPrompt { text: "a red cube" }],
            cfg_scale: CFG_SCALE,
            height: IMAGE_SIZE,
            width: IMAGE_SIZE,
            steps: STEPS,
            samples: 1,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["text_prompts"][0]["text"], "a red cube");
        assert_eq!(json["height"], 1024);
        assert_eq!(json["steps"], 30);
        assert_eq!(json["samples"], 1);
    }

    #[test]
    fn test_decode_artifact() {
        let response: TextToImageResponse =
            serde_json::from_str(r#"{"artifacts":[{"base64":"UE5HREFUQQ==","seed":1}]}"#).unwrap();
        assert_eq!(
            StabilityImageSource::decode_artifact(response).unwrap(),
            b"PNGDATA"
        );
    }

    #[test]
    fn test_decode_missing_artifact() {
        let response: TextToImageResponse = serde_json::from_str(r#"{"artifacts":[]}"#).unwrap();
        let err = StabilityImageSource::decode_artifact(response).unwrap_err();
        assert_eq!(err.to_string(), "No image returned from Stability AI");
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = StabilityConfig {
            api_url: DEFAULT_API_URL.into(),
            api_key: "sk-secret-value".into(),
            timeout: Duration::from_secs(1),
        };
        assert!(!format!("{config:?}").contains("sk-secret-value"));
    }
}
