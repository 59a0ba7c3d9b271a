//! Read-only verification against the ledger.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::binding::{binding_hash, output_hash, Sha256Hash};
use crate::error::{ProofError, VerificationError};
use crate::ledger::{LedgerAttestation, LedgerClient};

/// Note returned with a hash-only answer.
pub const HASH_ONLY_NOTE: &str = "Upload file with combined hash for full verification";

/// Answer to a lookup by combined hash. `verified == false` is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationResult {
    pub verified: bool,
    pub combined_hash: Sha256Hash,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_content_id: Option<String>,
}

impl AttestationResult {
    fn from_record(combined_hash: Sha256Hash, record: LedgerAttestation) -> Self {
        if !record.exists {
            return Self {
                verified: false,
                combined_hash,
                creator: None,
                timestamp: None,
                output_content_id: None,
            };
        }
        Self {
            verified: true,
            combined_hash,
            creator: Some(record.creator),
            timestamp: Some(record.timestamp),
            output_content_id: Some(record.output_content_id),
        }
    }
}

/// Content hash of a file, without any ledger lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashOnlyResult {
    pub output_hash: Sha256Hash,
    pub note: String,
}

/// What a holder of an artifact claims about it, usually read from its certificate.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactClaim {
    pub combined_hash: String,
    pub prompt_hash: String,
    /// Falls back to the ledger's creator when absent, if the ledger keeps it verbatim.
    #[serde(default)]
    pub creator_address: Option<String>,
    /// Binding timestamp in ms. Same fallback rule as `creator_address`.
    #[serde(default)]
    pub timestamp: Option<u64>,
}

/// Outcome of a full re-derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum ArtifactVerification {
    /// The bytes re-derive the registered hash.
    #[serde(rename_all = "camelCase")]
    Authentic {
        output_hash: Sha256Hash,
        record: LedgerAttestation,
    },
    /// A record exists but these bytes (or claims) do not produce it.
    #[serde(rename_all = "camelCase")]
    ContentMismatch {
        expected: Sha256Hash,
        actual: Sha256Hash,
    },
    /// Nothing is registered under the claimed hash.
    #[serde(rename_all = "camelCase")]
    NotRegistered { output_hash: Sha256Hash },
}

impl ArtifactVerification {
    pub fn is_authentic(&self) -> bool {
        matches!(self, Self::Authentic { .. })
    }
}

/// Answers verification requests. Never writes.
#[derive(Clone)]
pub struct Verifier {
    ledger: Arc<dyn LedgerClient>,
}

impl Verifier {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self { ledger }
    }

    /// Look up a combined hash on the ledger.
    #[instrument(level = "info", skip(self))]
    pub async fn verify_by_hash(
        &self,
        combined_hash: &str,
    ) -> Result<AttestationResult, VerificationError> {
        let hash = parse_hash(combined_hash)?;
        let record = self.ledger.verify(&hash).await?;
        debug!(exists = record.exists, "Ledger lookup complete");
        Ok(AttestationResult::from_record(hash, record))
    }

    /// Hash a file without consulting the ledger.
    pub fn compute_hash_only(&self, artifact: &[u8]) -> HashOnlyResult {
        compute_hash_only(artifact)
    }

    /// Re-derive the combined hash from the bytes and compare with the ledger.
    #[instrument(level = "info", skip(self, artifact, claim), fields(combined_hash = %claim.combined_hash, size = artifact.len()))]
    pub async fn verify_artifact(
        &self,
        artifact: &[u8],
        claim: &ArtifactClaim,
    ) -> Result<ArtifactVerification, VerificationError> {
        let expected = parse_hash(&claim.combined_hash)?;
        let prompt = parse_hash(&claim.prompt_hash)?;
        let output = output_hash(artifact);

        let record = self.ledger.verify(&expected).await?;
        if !record.exists {
            return Ok(ArtifactVerification::NotRegistered {
                output_hash: output,
            });
        }

        // Ledgers that record msg.sender and block time cannot fill in the binding fields
        let (creator, timestamp) = match (claim.creator_address.as_deref(), claim.timestamp) {
            (Some(creator), Some(timestamp)) => (creator, timestamp),
            (creator, timestamp) if self.ledger.records_binding_fields() => (
                creator.unwrap_or(&record.creator),
                timestamp.unwrap_or(record.timestamp),
            ),
            _ => {
                return Err(VerificationError::IncompleteClaim(
                    "creator address and binding timestamp are required for this ledger".into(),
                ))
            }
        };
        let actual = binding_hash(&prompt, &output, creator, timestamp);

        if actual == expected {
            Ok(ArtifactVerification::Authentic {
                output_hash: output,
                record,
            })
        } else {
            debug!(actual = %actual, "Re-derived hash differs from registered hash");
            Ok(ArtifactVerification::ContentMismatch { expected, actual })
        }
    }
}

/// Hash a file. Explicitly partial: no ledger lookup happens.
pub fn compute_hash_only(artifact: &[u8]) -> HashOnlyResult {
    HashOnlyResult {
        output_hash: output_hash(artifact),
        note: HASH_ONLY_NOTE.to_string(),
    }
}

fn parse_hash(input: &str) -> Result<Sha256Hash, VerificationError> {
    Sha256Hash::from_hex(input).map_err(|e| match e {
        ProofError::InvalidHash(msg) => VerificationError::InvalidHash(msg),
        other => VerificationError::InvalidHash(other.to_string()),
    })
}
