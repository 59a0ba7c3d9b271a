//! Certificate and storage-pointer types produced by the attestation pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::binding::{ProofBinding, Sha256Hash};
use crate::error::{ProofError, Result};

/// Sentinel for a content store that was not configured.
pub const NOT_AVAILABLE: &str = "not-available";

/// Sentinel for an upload that was attempted and failed.
pub const UPLOAD_FAILED: &str = "upload-failed";

/// Kind of artifact a creation request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    #[default]
    Image,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
        }
    }

    /// File extension used when naming uploads.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Image => "png",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Image => "image/png",
        }
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "image" => Ok(Self::Image),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location of an uploaded object, or why there is none.
///
/// Serialized as the bare content id, or as one of the sentinel strings
/// [`NOT_AVAILABLE`] / [`UPLOAD_FAILED`]. Never null.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContentRef {
    Stored(String),
    Unavailable,
    Failed,
}

impl ContentRef {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Stored(id) => id,
            Self::Unavailable => NOT_AVAILABLE,
            Self::Failed => UPLOAD_FAILED,
        }
    }

    pub fn content_id(&self) -> Option<&str> {
        match self {
            Self::Stored(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_stored(&self) -> bool {
        matches!(self, Self::Stored(_))
    }

    /// Parse a string produced by [`ContentRef::as_str`].
    pub fn parse(s: &str) -> Self {
        match s {
            NOT_AVAILABLE => Self::Unavailable,
            UPLOAD_FAILED => Self::Failed,
            id => Self::Stored(id.to_string()),
        }
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ContentRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ContentRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.is_empty() {
            return Err(serde::de::Error::custom("content reference must not be empty"));
        }
        Ok(Self::parse(&s))
    }
}

/// Content-store pointers for one attestation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRecord {
    pub output_content_id: ContentRef,
    pub metadata_content_id: ContentRef,
}

impl ArtifactRecord {
    pub fn is_degraded(&self) -> bool {
        !self.output_content_id.is_stored() || !self.metadata_content_id.is_stored()
    }
}

/// Metadata document uploaded next to the artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMetadata {
    pub prompt: String,
    pub prompt_hash: Sha256Hash,
    pub output_hash: Sha256Hash,
    pub combined_hash: Sha256Hash,
    pub creator: String,
    pub timestamp: u64,
    /// Content id of the artifact upload (or its sentinel).
    pub ipfs_link: ContentRef,
    #[serde(rename = "type")]
    pub kind: ArtifactKind,
}

impl ArtifactMetadata {
    pub fn new(
        prompt: &str,
        binding: &ProofBinding,
        output_content_id: &ContentRef,
        kind: ArtifactKind,
    ) -> Self {
        Self {
            prompt: prompt.to_string(),
            prompt_hash: binding.prompt_hash,
            output_hash: binding.output_hash,
            combined_hash: binding.combined_hash,
            creator: binding.creator_address.clone(),
            timestamp: binding.timestamp,
            ipfs_link: output_content_id.clone(),
            kind,
        }
    }
}

/// Outcome of the ledger registration stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Registration {
    #[serde(rename_all = "camelCase")]
    Registered { tx_id: String },
    #[serde(rename_all = "camelCase")]
    NotRegistered {
        reason: String,
        /// True when the cause is client configuration (e.g. wrong network).
        misconfiguration: bool,
    },
}

impl Registration {
    pub fn tx_id(&self) -> Option<&str> {
        match self {
            Self::Registered { tx_id } => Some(tx_id),
            Self::NotRegistered { .. } => None,
        }
    }

    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Registered { .. })
    }
}

/// Shareable locator that re-runs hash verification for `combined_hash`.
pub fn verification_locator(base_url: &str, combined_hash: &Sha256Hash) -> String {
    format!("{}/verify?hash={}", base_url.trim_end_matches('/'), combined_hash)
}

/// Everything a creator needs to prove authorship later.
///
/// Built once at the end of a pipeline run and handed to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    #[serde(flatten)]
    pub binding: ProofBinding,
    #[serde(flatten)]
    pub record: ArtifactRecord,
    #[serde(rename = "type")]
    pub kind: ArtifactKind,
    pub registration: Registration,
    pub verification_url: String,
}

impl Certificate {
    pub fn combined_hash(&self) -> &Sha256Hash {
        &self.binding.combined_hash
    }

    /// Whether any field carries a placeholder instead of a real value.
    pub fn is_degraded(&self) -> bool {
        self.record.is_degraded() || !self.registration.is_registered()
    }

    /// Human-readable notes for every degraded field.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        match &self.record.output_content_id {
            ContentRef::Stored(_) => {}
            ContentRef::Unavailable => {
                warnings.push("Artifact was not stored: content store not available".into())
            }
            ContentRef::Failed => warnings.push("Artifact upload to content store failed".into()),
        }
        match &self.record.metadata_content_id {
            ContentRef::Stored(_) => {}
            ContentRef::Unavailable => {
                warnings.push("Metadata was not stored: content store not available".into())
            }
            ContentRef::Failed => warnings.push("Metadata upload to content store failed".into()),
        }
        if let Registration::NotRegistered { reason, .. } = &self.registration {
            warnings.push(format!(
                "Proof is not registered on the ledger ({reason}); the combined hash can be registered later"
            ));
        }

        warnings
    }

    /// Serialize the certificate to CBOR bytes.
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        ciborium::into_writer(self, &mut bytes)
            .map_err(|e| ProofError::SerializationError(e.to_string()))?;
        Ok(bytes)
    }

    /// Deserialize a certificate from CBOR bytes.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| ProofError::SerializationError(e.to_string()))
    }
}

/// A finished pipeline run: the certificate plus the generated bytes.
#[derive(Debug, Clone)]
pub struct Attestation {
    pub certificate: Certificate,
    pub artifact: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_certificate(registration: Registration, record: ArtifactRecord) -> Certificate {
        let binding = ProofBinding::new("a red cube", b"PNGDATA", "0xABC", 1_700_000_000_000);
        let verification_url = verification_locator("https://proofart.app/", &binding.combined_hash);
        Certificate {
            binding,
            record,
            kind: ArtifactKind::Image,
            registration,
            verification_url,
        }
    }

    fn stored_record() -> ArtifactRecord {
        ArtifactRecord {
            output_content_id: ContentRef::Stored("QmOutput".into()),
            metadata_content_id: ContentRef::Stored("QmMeta".into()),
        }
    }

    #[test]
    fn test_content_ref_sentinels() {
        assert_eq!(ContentRef::Unavailable.to_string(), "not-available");
        assert_eq!(ContentRef::Failed.to_string(), "upload-failed");
        assert_eq!(ContentRef::parse("upload-failed"), ContentRef::Failed);
        assert_eq!(ContentRef::parse("QmX"), ContentRef::Stored("QmX".into()));
        assert_eq!(ContentRef::Failed.content_id(), None);
    }

    #[test]
    fn test_content_ref_rejects_empty_string() {
        let result: std::result::Result<ContentRef, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_artifact_kind_parsing() {
        assert_eq!("image".parse::<ArtifactKind>(), Ok(ArtifactKind::Image));
        assert_eq!(" IMAGE ".parse::<ArtifactKind>(), Ok(ArtifactKind::Image));
        assert_eq!("text".parse::<ArtifactKind>(), Err("text".to_string()));
    }

    #[test]
    fn test_verification_locator_embeds_hash() {
        let binding = ProofBinding::new("p", b"o", "0x1", 1);
        let url = verification_locator("https://example.org/", &binding.combined_hash);
        assert_eq!(
            url,
            format!("https://example.org/verify?hash={}", binding.combined_hash)
        );
    }

    #[test]
    fn test_certificate_flattens_external_shape() {
        let cert = sample_certificate(
            Registration::Registered {
                tx_id: "0xfeed".into(),
            },
            stored_record(),
        );
        let json = serde_json::to_value(&cert).unwrap();

        assert_eq!(json["creatorAddress"], "0xABC");
        assert_eq!(json["outputContentId"], "QmOutput");
        assert_eq!(json["metadataContentId"], "QmMeta");
        assert_eq!(json["type"], "image");
        assert_eq!(json["registration"]["status"], "registered");
        assert_eq!(json["registration"]["txId"], "0xfeed");
        assert!(!cert.is_degraded());
        assert!(cert.warnings().is_empty());
    }

    #[test]
    fn test_degraded_certificate_is_explicit() {
        let cert = sample_certificate(
            Registration::NotRegistered {
                reason: "ledger transport error: connection refused".into(),
                misconfiguration: false,
            },
            ArtifactRecord {
                output_content_id: ContentRef::Failed,
                metadata_content_id: ContentRef::Unavailable,
            },
        );
        let json = serde_json::to_value(&cert).unwrap();

        assert_eq!(json["outputContentId"], "upload-failed");
        assert_eq!(json["metadataContentId"], "not-available");
        assert_eq!(json["registration"]["status"], "not-registered");
        assert!(cert.is_degraded());
        assert_eq!(cert.warnings().len(), 3);
    }

    #[test]
    fn test_certificate_cbor_roundtrip() {
        let cert = sample_certificate(
            Registration::Registered {
                tx_id: "0xabc".into(),
            },
            stored_record(),
        );
        let restored = Certificate::from_cbor(&cert.to_cbor().unwrap()).unwrap();
        assert_eq!(restored, cert);
        assert!(restored.binding.is_consistent());
    }

    #[test]
    fn test_metadata_document_shape() {
        let binding = ProofBinding::new("a red cube", b"PNGDATA", "0xABC", 42);
        let meta = ArtifactMetadata::new(
            "a red cube",
            &binding,
            &ContentRef::Failed,
            ArtifactKind::Image,
        );
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["prompt"], "a red cube");
        assert_eq!(json["creator"], "0xABC");
        assert_eq!(json["ipfsLink"], "upload-failed");
        assert_eq!(json["type"], "image");
        assert_eq!(json["timestamp"], 42);
    }
}
