//! Attestation pipeline: generate, bind, store, register.
//!
//! Stages run strictly in order:
//!
//! ```text
//! Generating -> Binding -> Storing -> Registering -> Complete
//!      \
//!       `-> Failed
//! ```
//!
//! Only a generation failure is fatal. Store and ledger failures are caught
//! inside their stage and recorded in the certificate as sentinels or as
//! "not registered".

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};

use crate::binding::ProofBinding;
use crate::certificate::{
    verification_locator, ArtifactKind, ArtifactMetadata, ArtifactRecord, Attestation,
    Certificate, ContentRef, Registration,
};
use crate::error::{AttestationError, ConfigurationError, GenerationError, LedgerError, StoreError};
use crate::generation::{ArtifactSource, ArtifactSourceFactory, GenerationConfig};
use crate::ledger::{LedgerClient, RegistrationRequest};
use crate::store::ContentStore;

/// Default bound on a single external call.
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(120);

pub const DEFAULT_VERIFY_BASE_URL: &str = "http://localhost:3000";

/// Pipeline position, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Generating,
    Binding,
    Storing,
    Registering,
    Complete,
    Failed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Generating => "generating",
            Self::Binding => "binding",
            Self::Storing => "storing",
            Self::Registering => "registering",
            Self::Complete => "complete",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationRequest {
    pub prompt: String,
    pub creator_address: String,
    pub kind: ArtifactKind,
}

impl AttestationRequest {
    pub fn new(prompt: impl Into<String>, creator_address: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            creator_address: creator_address.into(),
            kind: ArtifactKind::Image,
        }
    }

    fn validate(&self) -> Result<(), AttestationError> {
        if self.prompt.trim().is_empty() {
            return Err(AttestationError::InvalidRequest("prompt must not be empty".into()));
        }
        if self.creator_address.trim().is_empty() {
            return Err(AttestationError::InvalidRequest(
                "creator address must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Pipeline settings.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Upper bound for each external call.
    pub stage_timeout: Duration,
    /// Base of the public verification locator.
    pub verify_base_url: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
            verify_base_url: DEFAULT_VERIFY_BASE_URL.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load from `STAGE_TIMEOUT_SECS` and `VERIFY_BASE_URL`.
    pub fn from_env() -> Self {
        let stage_timeout = std::env::var("STAGE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|secs: &u64| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_STAGE_TIMEOUT);

        Self {
            stage_timeout,
            verify_base_url: std::env::var("VERIFY_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_VERIFY_BASE_URL.to_string()),
        }
    }
}

/// Drives one creation request through every stage.
///
/// Holds no per-request state, so one instance can serve concurrent requests.
pub struct AttestationPipeline {
    source: Arc<dyn ArtifactSource>,
    store: Arc<dyn ContentStore>,
    ledger: Arc<dyn LedgerClient>,
    config: PipelineConfig,
}

impl AttestationPipeline {
    pub fn new(
        source: Arc<dyn ArtifactSource>,
        store: Arc<dyn ContentStore>,
        ledger: Arc<dyn LedgerClient>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            source,
            store,
            ledger,
            config,
        }
    }

    /// Build the generation backend from credentials, then the pipeline.
    ///
    /// Fails before any stage runs when no backend has usable credentials.
    pub fn from_config(
        generation: &GenerationConfig,
        store: Arc<dyn ContentStore>,
        ledger: Arc<dyn LedgerClient>,
        config: PipelineConfig,
    ) -> Result<Self, ConfigurationError> {
        let source = ArtifactSourceFactory::create(generation)?;
        Ok(Self::new(source, store, ledger, config))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline, stamping the binding with the current time.
    pub async fn attest(
        &self,
        request: &AttestationRequest,
    ) -> Result<Attestation, AttestationError> {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        self.attest_at(request, now).await
    }

    /// Run the pipeline with a fixed binding timestamp (milliseconds).
    #[instrument(
        level = "info",
        skip(self, request),
        fields(creator = %request.creator_address, kind = %request.kind)
    )]
    pub async fn attest_at(
        &self,
        request: &AttestationRequest,
        timestamp: u64,
    ) -> Result<Attestation, AttestationError> {
        request.validate()?;

        let artifact = self.generate(request).await?;

        enter(PipelineStage::Binding);
        let binding = ProofBinding::new(
            &request.prompt,
            &artifact,
            &request.creator_address,
            timestamp,
        );
        debug!(combined_hash = %binding.combined_hash, "Binding computed");

        enter(PipelineStage::Storing);
        let record = self.store(request, &binding, &artifact).await;

        enter(PipelineStage::Registering);
        let registration = self.register(&binding, &record.output_content_id).await;

        enter(PipelineStage::Complete);
        let certificate = Certificate {
            verification_url: verification_locator(
                &self.config.verify_base_url,
                &binding.combined_hash,
            ),
            binding,
            record,
            kind: request.kind,
            registration,
        };

        info!(
            combined_hash = %certificate.combined_hash(),
            degraded = certificate.is_degraded(),
            registered = certificate.registration.is_registered(),
            "Attestation complete"
        );

        Ok(Attestation {
            certificate,
            artifact,
        })
    }

    async fn generate(&self, request: &AttestationRequest) -> Result<Vec<u8>, AttestationError> {
        enter(PipelineStage::Generating);

        let result = bounded(
            self.config.stage_timeout,
            self.source.generate(&request.prompt, request.kind),
            |secs| GenerationError::Timeout { secs },
        )
        .await;

        match result {
            Ok(bytes) => {
                debug!(backend = %self.source.backend(), bytes = bytes.len(), "Artifact generated");
                Ok(bytes)
            }
            Err(e) => {
                error!(stage = %PipelineStage::Failed, error = %e, "Generation failed; no attestation issued");
                Err(AttestationError::Generation(e))
            }
        }
    }

    /// Artifact and metadata uploads. Each failure degrades only its own id.
    async fn store(
        &self,
        request: &AttestationRequest,
        binding: &ProofBinding,
        artifact: &[u8],
    ) -> ArtifactRecord {
        let artifact_name = format!("output-{}.{}", binding.timestamp, request.kind.extension());
        let upload = bounded(
            self.config.stage_timeout,
            self.store.upload(artifact, &artifact_name),
            |secs| StoreError::Timeout { secs },
        )
        .await;
        let output_content_id = content_ref(upload, "artifact", binding);

        let metadata = ArtifactMetadata::new(&request.prompt, binding, &output_content_id, request.kind);
        let metadata_name = format!("metadata-{}.json", binding.timestamp);
        let upload = match serde_json::to_value(&metadata) {
            Ok(document) => {
                bounded(
                    self.config.stage_timeout,
                    self.store.upload_json(&document, &metadata_name),
                    |secs| StoreError::Timeout { secs },
                )
                .await
            }
            Err(e) => Err(StoreError::Upload(format!("Failed to encode metadata: {e}"))),
        };
        let metadata_content_id = content_ref(upload, "metadata", binding);

        ArtifactRecord {
            output_content_id,
            metadata_content_id,
        }
    }

    async fn register(&self, binding: &ProofBinding, output_content_id: &ContentRef) -> Registration {
        let request = RegistrationRequest::new(binding, output_content_id);
        let result = bounded(
            self.config.stage_timeout,
            self.ledger.register(&request),
            |secs| LedgerError::Timeout { secs },
        )
        .await;

        match result {
            Ok(tx_id) => {
                info!(tx_id = %tx_id, network = %self.ledger.network_name(), "Proof registered");
                Registration::Registered { tx_id }
            }
            Err(e) => {
                warn!(
                    stage = %PipelineStage::Registering,
                    combined_hash = %binding.combined_hash,
                    misconfiguration = e.is_misconfiguration(),
                    error = %e,
                    "Registration failed; certificate marked not registered"
                );
                Registration::NotRegistered {
                    reason: e.to_string(),
                    misconfiguration: e.is_misconfiguration(),
                }
            }
        }
    }
}

fn enter(stage: PipelineStage) {
    debug!(stage = %stage, "Pipeline stage");
}

/// Run `fut` with an upper bound, mapping an elapsed timer to `on_timeout(secs)`.
async fn bounded<T, E, F>(limit: Duration, fut: F, on_timeout: impl FnOnce(u64) -> E) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout(limit.as_secs())),
    }
}

fn content_ref(result: Result<String, StoreError>, what: &str, binding: &ProofBinding) -> ContentRef {
    match result {
        Ok(id) => {
            debug!(content_id = %id, what, "Uploaded");
            ContentRef::Stored(id)
        }
        Err(StoreError::Unavailable(reason)) => {
            warn!(
                stage = %PipelineStage::Storing,
                combined_hash = %binding.combined_hash,
                what,
                reason = %reason,
                "Content store not available"
            );
            ContentRef::Unavailable
        }
        Err(e) => {
            warn!(
                stage = %PipelineStage::Storing,
                combined_hash = %binding.combined_hash,
                what,
                error = %e,
                "Upload failed; continuing without a stored copy"
            );
            ContentRef::Failed
        }
    }
}
