//! Ordered chain of artifact sources.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::{ArtifactSource, GenerationBackend};
use crate::certificate::ArtifactKind;
use crate::error::GenerationError;

/// Tries each source in order and returns the first artifact produced.
///
/// When every source fails, the error of the last one is returned.
pub struct FallbackArtifactSource {
    sources: Vec<Arc<dyn ArtifactSource>>,
}

impl FallbackArtifactSource {
    pub fn new(sources: Vec<Arc<dyn ArtifactSource>>) -> Self {
        Self { sources }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[async_trait]
impl ArtifactSource for FallbackArtifactSource {
    async fn generate(
        &self,
        prompt: &str,
        kind: ArtifactKind,
    ) -> Result<Vec<u8>, GenerationError> {
        let mut last_error =
            GenerationError::Upstream("No image generation backend configured".into());

        for source in &self.sources {
            match source.generate(prompt, kind).await {
                Ok(bytes) => {
                    info!(backend = %source.backend(), "Generation succeeded");
                    return Ok(bytes);
                }
                Err(e) => {
                    warn!(backend = %source.backend(), error = %e, "Generation backend failed, trying next");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    fn backend(&self) -> GenerationBackend {
        GenerationBackend::Fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::MockArtifactSource;

    #[tokio::test]
    async fn test_first_success_wins() {
        let failing = Arc::new(MockArtifactSource::failing("quota exceeded"));
        let working = Arc::new(MockArtifactSource::default());
        let chain = FallbackArtifactSource::new(vec![failing.clone(), working.clone()]);

        let bytes = chain.generate("a red cube", ArtifactKind::Image).await.unwrap();
        assert_eq!(bytes, MockArtifactSource::artifact_for("a red cube"));
        assert_eq!(failing.calls(), 1);
        assert_eq!(working.calls(), 1);
    }

    #[tokio::test]
    async fn test_later_sources_skipped_after_success() {
        let first = Arc::new(MockArtifactSource::default());
        let second = Arc::new(MockArtifactSource::default());
        let chain = FallbackArtifactSource::new(vec![first.clone(), second.clone()]);

        chain.generate("x", ArtifactKind::Image).await.unwrap();
        assert_eq!(second.calls(), 0);
    }

    #[tokio::test]
    async fn test_all_failing_returns_last_error() {
        let chain = FallbackArtifactSource::new(vec![
            Arc::new(MockArtifactSource::failing("first")),
            Arc::new(MockArtifactSource::failing("second")),
        ]);

        let err = chain.generate("x", ArtifactKind::Image).await.unwrap_err();
        assert_eq!(err, GenerationError::Upstream("second".into()));
    }
}
