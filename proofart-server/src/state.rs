//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use proofart_core::generation::{ArtifactSourceFactory, GenerationBackend};
use proofart_core::store::StoreProvider;
use proofart_core::{
    ArtifactSource, AttestationPipeline, ConfigurationError, ContentStore, ContentStoreFactory,
    LedgerClient, LedgerFactory, PipelineConfig, Verifier,
};

use crate::config::Config;

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Creation pipeline, or the reason it cannot run (reported per request)
    pub pipeline: Result<Arc<AttestationPipeline>, ConfigurationError>,
    /// Read-only verification against the ledger
    pub verifier: Verifier,
    /// Ledger handle used by readiness checks
    pub ledger: Arc<dyn LedgerClient>,
    /// Which content store uploads go to
    pub store_provider: StoreProvider,
    /// Which generation backend is in use, if any
    pub generation_backend: Option<GenerationBackend>,
    /// Largest file accepted by /verify, in bytes
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Build every capability from configuration.
    ///
    /// With `allow_mock_backends`, any capability that has no configuration
    /// falls back to its in-memory implementation.
    pub fn from_config(config: &Config) -> Self {
        let mock = config.allow_mock_backends;

        let source: Result<Arc<dyn ArtifactSource>, ConfigurationError> =
            if mock && !config.generation.has_credentials() {
                tracing::warn!("Generation: using mock artifact source");
                Ok(ArtifactSourceFactory::create_mock())
            } else {
                ArtifactSourceFactory::create(&config.generation)
            };

        let store: Arc<dyn ContentStore> = if mock && !config.store.is_available() {
            tracing::warn!("Content store: using in-memory store");
            ContentStoreFactory::create_in_memory()
        } else {
            ContentStoreFactory::create(&config.store)
        };

        let ledger: Arc<dyn LedgerClient> = if mock && !config.ledger.can_read() {
            tracing::warn!("Ledger: using in-memory ledger");
            LedgerFactory::create_in_memory()
        } else {
            LedgerFactory::create(&config.ledger)
        };

        if let Err(e) = &source {
            tracing::error!(error = %e, "Generation not configured; /generate will fail");
        }

        Self::with_capabilities(
            source,
            store,
            ledger,
            config.pipeline.clone(),
            config.body_limit_mb * 1024 * 1024,
        )
    }

    /// Assemble state from already-built capabilities.
    pub fn with_capabilities(
        source: Result<Arc<dyn ArtifactSource>, ConfigurationError>,
        store: Arc<dyn ContentStore>,
        ledger: Arc<dyn LedgerClient>,
        pipeline_config: PipelineConfig,
        max_upload_bytes: usize,
    ) -> Self {
        let generation_backend = source.as_ref().ok().map(|s| s.backend());
        let store_provider = store.provider();
        let pipeline = source.map(|source| {
            Arc::new(AttestationPipeline::new(
                source,
                store,
                ledger.clone(),
                pipeline_config,
            ))
        });

        Self {
            pipeline,
            verifier: Verifier::new(ledger.clone()),
            ledger,
            store_provider,
            generation_backend,
            max_upload_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proofart_core::AttestationRequest;

    #[test]
    fn test_default_config_uses_in_memory_backends() {
        let state = AppState::from_config(&Config::default());
        assert!(state.pipeline.is_ok());
        assert_eq!(state.store_provider, StoreProvider::InMemory);
        assert_eq!(state.generation_backend, Some(GenerationBackend::Mock));
        assert_eq!(state.ledger.network_name(), "localhost");
    }

    #[test]
    fn test_missing_credentials_without_mocks() {
        let config = Config {
            allow_mock_backends: false,
            ..Config::default()
        };
        let state = AppState::from_config(&config);
        assert!(state.pipeline.is_err());
        assert_eq!(state.generation_backend, None);
        assert_eq!(state.store_provider, StoreProvider::Unavailable);
    }

    #[tokio::test]
    async fn test_mock_ledger_records_request_creator() {
        let state = AppState::from_config(&Config::default());
        let pipeline = state.pipeline.clone().unwrap();
        let attestation = pipeline
            .attest(&AttestationRequest::new("a red cube", "0xABC"))
            .await
            .unwrap();

        let result = state
            .verifier
            .verify_by_hash(&attestation.certificate.combined_hash().to_hex())
            .await
            .unwrap();
        assert!(result.verified);
        assert_eq!(result.creator.as_deref(), Some("0xABC"));
        assert_eq!(result.timestamp, Some(attestation.certificate.binding.timestamp));
    }
}
