//! Proof-of-Art Core - attestation of generated artifacts
//!
//! This crate binds a generated artifact to its prompt, its creator and the
//! moment of creation, stores it in a content-addressable store and registers
//! the binding on a public ledger so anyone can verify it later.
//!
//! # Features
//!
//! - SHA-256 binding hash, re-derivable without trusting the server
//! - Generation backends: Stability AI, OpenAI, with fallback
//! - Content stores: Pinata, IPFS node
//! - Ledger: EVM registry contract via alloy
//! - In-memory fakes for every external capability
//!
//! Only [`binding`], [`certificate`] and [`error`] are available without the
//! `network` feature (used by the Wasm build).
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use proofart_core::{
//!     AttestationPipeline, AttestationRequest, InMemoryContentStore, InMemoryLedger,
//!     MockArtifactSource, PipelineConfig, Verifier,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ledger = Arc::new(InMemoryLedger::new());
//! let pipeline = AttestationPipeline::new(
//!     Arc::new(MockArtifactSource::default()),
//!     Arc::new(InMemoryContentStore::new()),
//!     ledger.clone(),
//!     PipelineConfig::default(),
//! );
//!
//! let attestation = pipeline
//!     .attest(&AttestationRequest::new("a red cube", "0xABC"))
//!     .await?;
//!
//! let verifier = Verifier::new(ledger);
//! let result = verifier
//!     .verify_by_hash(&attestation.certificate.combined_hash().to_hex())
//!     .await?;
//! assert!(result.verified);
//! # Ok(())
//! # }
//! ```

pub mod binding;
pub mod certificate;
pub mod error;

#[cfg(feature = "network")]
pub mod generation;
#[cfg(feature = "network")]
mod http_client;
#[cfg(feature = "network")]
pub mod ledger;
#[cfg(feature = "network")]
pub mod pipeline;
#[cfg(feature = "network")]
pub mod store;
#[cfg(feature = "network")]
pub mod verifier;

pub use binding::{binding_hash, output_hash, prompt_hash, ProofBinding, Sha256Hash, HASH_HEX_LEN};
pub use certificate::{
    verification_locator, ArtifactKind, ArtifactMetadata, ArtifactRecord, Attestation,
    Certificate, ContentRef, Registration, NOT_AVAILABLE, UPLOAD_FAILED,
};
pub use error::{
    AttestationError, ConfigurationError, GenerationError, LedgerError, ProofError, Result,
    StoreError, VerificationError,
};

#[cfg(feature = "network")]
pub use generation::{ArtifactSource, ArtifactSourceFactory, GenerationConfig, MockArtifactSource};
#[cfg(feature = "network")]
pub use ledger::{
    InMemoryLedger, LedgerAttestation, LedgerClient, LedgerConfig, LedgerFactory,
    RegistrationRequest,
};
#[cfg(feature = "network")]
pub use pipeline::{AttestationPipeline, AttestationRequest, PipelineConfig, PipelineStage};
#[cfg(feature = "network")]
pub use store::{ContentStore, ContentStoreFactory, InMemoryContentStore, StoreConfig};
#[cfg(feature = "network")]
pub use verifier::{
    compute_hash_only, ArtifactClaim, ArtifactVerification, AttestationResult, HashOnlyResult,
    Verifier,
};
