//! Mock artifact source for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{ArtifactSource, GenerationBackend};
use crate::certificate::ArtifactKind;
use crate::error::GenerationError;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Deterministic artifact source.
/// WARNING: Do not use in production - the "image" is a hash of the prompt!
#[derive(Default)]
pub struct MockArtifactSource {
    failure: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockArtifactSource {
    /// A source whose every call fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// A source that sleeps before answering. Used to exercise timeouts.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Bytes produced for `prompt`: a PNG signature followed by SHA-256(prompt).
    pub fn artifact_for(prompt: &str) -> Vec<u8> {
        let mut bytes = PNG_SIGNATURE.to_vec();
        bytes.extend_from_slice(&Sha256::digest(prompt.as_bytes()));
        bytes
    }

    /// Number of `generate` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtifactSource for MockArtifactSource {
    async fn generate(
        &self,
        prompt: &str,
        _kind: ArtifactKind,
    ) -> Result<Vec<u8>, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.failure {
            return Err(GenerationError::Upstream(message.clone()));
        }

        Ok(Self::artifact_for(prompt))
    }

    fn backend(&self) -> GenerationBackend {
        GenerationBackend::Mock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_is_deterministic() {
        let source = MockArtifactSource::default();
        let a = source.generate("a red cube", ArtifactKind::Image).await.unwrap();
        let b = source.generate("a red cube", ArtifactKind::Image).await.unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with(&PNG_SIGNATURE));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_different_prompts_differ() {
        let source = MockArtifactSource::default();
        let a = source.generate("a", ArtifactKind::Image).await.unwrap();
        let b = source.generate("b", ArtifactKind::Image).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_failing_mock() {
        let source = MockArtifactSource::failing("Stability AI error: invalid key");
        let err = source.generate("x", ArtifactKind::Image).await.unwrap_err();
        assert_eq!(err.to_string(), "Stability AI error: invalid key");
    }
}
