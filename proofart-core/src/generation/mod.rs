//! Artifact sources: external services that turn a prompt into bytes.
//!
//! ## Providers
//!
//! - **Stability AI** - SDXL text-to-image (preferred when configured)
//! - **OpenAI** - DALL-E 3, image downloaded from the returned URL
//! - **Mock** - Deterministic bytes for testing
//!
//! ## Quick Start
//!
//! ```no_run
//! use proofart_core::generation::{ArtifactSourceFactory, GenerationConfig};
//! use proofart_core::ArtifactKind;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = ArtifactSourceFactory::create(&GenerationConfig::from_env())?;
//! let bytes = source.generate("a red cube", ArtifactKind::Image).await?;
//! # Ok(())
//! # }
//! ```

mod fallback;
mod mock;
mod openai;
mod stability;

pub use fallback::FallbackArtifactSource;
pub use mock::MockArtifactSource;
pub use openai::{OpenAiConfig, OpenAiImageSource};
pub use stability::{StabilityConfig, StabilityImageSource};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::certificate::ArtifactKind;
use crate::error::{ConfigurationError, GenerationError};

/// Default timeout for a generation request. Image models are slow.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Keys shipped in `.env` templates. Treated as unset.
const PLACEHOLDER_KEYS: &[&str] = &[
    "sk-your-key-here",
    "sk-your-ke...",
    "your-stability-api-key-here",
];

/// Trait for external generation services.
///
/// Implementations must be thread-safe (`Send + Sync`).
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Produce the artifact bytes for `prompt`.
    ///
    /// Fails with a human-readable cause when the upstream errors, times out
    /// or returns no usable result.
    async fn generate(&self, prompt: &str, kind: ArtifactKind)
        -> Result<Vec<u8>, GenerationError>;

    /// Which backend produced the artifact.
    fn backend(&self) -> GenerationBackend;
}

/// Identifies a generation backend in logs and health output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationBackend {
    StabilityAi,
    OpenAi,
    /// Ordered chain of backends
    Fallback,
    /// Deterministic source for testing only
    Mock,
}

impl std::fmt::Display for GenerationBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StabilityAi => write!(f, "Stability AI"),
            Self::OpenAi => write!(f, "OpenAI"),
            Self::Fallback => write!(f, "Fallback chain"),
            Self::Mock => write!(f, "Mock (NOT A REAL MODEL)"),
        }
    }
}

/// Credentials and limits for the generation backends.
#[derive(Clone)]
pub struct GenerationConfig {
    pub stability_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub timeout: Duration,
}

impl std::fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationConfig")
            .field(
                "stability_api_key",
                &self.stability_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            stability_api_key: None,
            openai_api_key: None,
            timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }
}

impl GenerationConfig {
    /// Load from `STABILITY_API_KEY`, `OPENAI_API_KEY`, `GENERATION_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let timeout = std::env::var("GENERATION_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_GENERATION_TIMEOUT);

        Self {
            stability_api_key: std::env::var("STABILITY_API_KEY").ok(),
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            timeout,
        }
    }

    pub fn stability_key(&self) -> Option<&str> {
        self.stability_api_key.as_deref().and_then(usable_key)
    }

    pub fn openai_key(&self) -> Option<&str> {
        self.openai_api_key.as_deref().and_then(usable_key)
    }

    /// Whether at least one backend has a usable key.
    pub fn has_credentials(&self) -> bool {
        self.stability_key().is_some() || self.openai_key().is_some()
    }
}

/// A key counts only if it is non-empty, longer than 10 chars and not a placeholder.
fn usable_key(raw: &str) -> Option<&str> {
    let key = raw.trim();
    if key.len() > 10 && !PLACEHOLDER_KEYS.contains(&key) {
        Some(key)
    } else {
        None
    }
}

/// Factory for creating artifact sources.
pub struct ArtifactSourceFactory;

impl ArtifactSourceFactory {
    /// Build the configured backends in priority order: Stability AI, then OpenAI.
    ///
    /// Fails before any network call when no backend has usable credentials.
    pub fn create(config: &GenerationConfig) -> Result<Arc<dyn ArtifactSource>, ConfigurationError> {
        let mut sources: Vec<Arc<dyn ArtifactSource>> = Vec::new();

        if let Some(key) = config.stability_key() {
            let source = StabilityImageSource::new(StabilityConfig::new(key, config.timeout))?;
            sources.push(Arc::new(source));
        }
        if let Some(key) = config.openai_key() {
            let source = OpenAiImageSource::new(OpenAiConfig::new(key, config.timeout))?;
            sources.push(Arc::new(source));
        }

        match sources.len() {
            0 => Err(ConfigurationError(
                "No image generation API key found. Please set either STABILITY_API_KEY or OPENAI_API_KEY."
                    .into(),
            )),
            1 => {
                let source = sources.remove(0);
                info!(backend = %source.backend(), "Selected generation backend");
                Ok(source)
            }
            _ => {
                info!(backends = sources.len(), "Selected generation fallback chain");
                Ok(Arc::new(FallbackArtifactSource::new(sources)))
            }
        }
    }

    /// Create a mock source for testing.
    pub fn create_mock() -> Arc<dyn ArtifactSource> {
        Arc::new(MockArtifactSource::default())
    }
}
