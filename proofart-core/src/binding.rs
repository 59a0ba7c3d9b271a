//! Hash binding: ties a prompt, an artifact, a creator and a moment together.
//!
//! The combined hash is the public identifier of an attestation. It is
//! `SHA256(promptHash ‖ outputHash ‖ creatorAddress ‖ timestamp)` where each
//! component is rendered as a string: lowercase hex for the two digests, the
//! address verbatim, and the timestamp as a base-10 integer. Anyone holding
//! the four inputs can re-derive it without trusting the issuing server.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::{ProofError, Result};

/// Length of a hex-encoded SHA-256 digest.
pub const HASH_HEX_LEN: usize = 64;

/// A 32-byte SHA-256 digest, rendered as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sha256Hash(pub [u8; 32]);

impl Sha256Hash {
    /// Compute the SHA-256 digest of `data`.
    pub fn digest(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Parse a 64-char hex digest. A leading `0x` is accepted.
    pub fn from_hex(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let hex_part = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if hex_part.len() != HASH_HEX_LEN {
            return Err(ProofError::InvalidHash(format!(
                "expected {HASH_HEX_LEN} hex characters, got {}",
                hex_part.len()
            )));
        }

        let bytes = hex::decode(hex_part)
            .map_err(|e| ProofError::InvalidHash(format!("not valid hex: {e}")))?;

        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sha256Hash({}...)", &self.to_hex()[..12])
    }
}

impl Serialize for Sha256Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Sha256Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Digest of the UTF-8 prompt text.
pub fn prompt_hash(prompt: &str) -> Sha256Hash {
    Sha256Hash::digest(prompt.as_bytes())
}

/// Digest of the artifact's raw bytes.
pub fn output_hash(artifact: &[u8]) -> Sha256Hash {
    Sha256Hash::digest(artifact)
}

/// The combined binding hash. Argument order is part of the public contract.
pub fn binding_hash(
    prompt_hash: &Sha256Hash,
    output_hash: &Sha256Hash,
    creator_address: &str,
    timestamp_ms: u64,
) -> Sha256Hash {
    let combined = format!("{prompt_hash}{output_hash}{creator_address}{timestamp_ms}");
    Sha256Hash::digest(combined.as_bytes())
}

/// The semantic payload of an attestation. Computed once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofBinding {
    pub prompt_hash: Sha256Hash,
    pub output_hash: Sha256Hash,
    pub combined_hash: Sha256Hash,
    pub creator_address: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl ProofBinding {
    /// Bind a prompt and artifact to a creator at `timestamp_ms`.
    pub fn new(prompt: &str, artifact: &[u8], creator_address: &str, timestamp_ms: u64) -> Self {
        Self::from_hashes(
            prompt_hash(prompt),
            output_hash(artifact),
            creator_address,
            timestamp_ms,
        )
    }

    /// Bind pre-computed content hashes.
    pub fn from_hashes(
        prompt_hash: Sha256Hash,
        output_hash: Sha256Hash,
        creator_address: &str,
        timestamp_ms: u64,
    ) -> Self {
        let combined_hash =
            binding_hash(&prompt_hash, &output_hash, creator_address, timestamp_ms);
        Self {
            prompt_hash,
            output_hash,
            combined_hash,
            creator_address: creator_address.to_string(),
            timestamp: timestamp_ms,
        }
    }

    /// Re-derive the combined hash from the other four fields.
    pub fn recompute(&self) -> Sha256Hash {
        binding_hash(
            &self.prompt_hash,
            &self.output_hash,
            &self.creator_address,
            self.timestamp,
        )
    }

    /// Whether the stored combined hash matches its inputs.
    pub fn is_consistent(&self) -> bool {
        self.recompute() == self.combined_hash
    }

    /// Whether `artifact` is the exact content this binding covers.
    pub fn covers_artifact(&self, artifact: &[u8]) -> bool {
        output_hash(artifact) == self.output_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROMPT: &str = "a red cube";
    const ARTIFACT: &[u8] = b"PNGDATA";
    const CREATOR: &str = "0xABC";
    const TS: u64 = 1_700_000_000_000;

    fn sha256_hex(data: &[u8]) -> String {
        hex::encode(Sha256::digest(data))
    }

    #[test]
    fn test_reference_scenario() {
        let binding = ProofBinding::new(PROMPT, ARTIFACT, CREATOR, TS);

        let expected_prompt = sha256_hex(PROMPT.as_bytes());
        let expected_output = sha256_hex(ARTIFACT);
        let expected_combined = sha256_hex(
            format!("{expected_prompt}{expected_output}{CREATOR}1700000000000").as_bytes(),
        );

        assert_eq!(binding.prompt_hash.to_hex(), expected_prompt);
        assert_eq!(binding.output_hash.to_hex(), expected_output);
        assert_eq!(binding.combined_hash.to_hex(), expected_combined);
        assert_eq!(binding.timestamp, TS);
        assert_eq!(binding.creator_address, CREATOR);
    }

    #[test]
    fn test_known_prompt_digest() {
        // sha256("abc")
        assert_eq!(
            prompt_hash("abc").to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_binding_is_deterministic() {
        let a = ProofBinding::new(PROMPT, ARTIFACT, CREATOR, TS);
        let b = ProofBinding::new(PROMPT, ARTIFACT, CREATOR, TS);
        assert_eq!(a, b);
        assert!(a.is_consistent());
    }

    #[test]
    fn test_any_single_input_change_changes_combined_hash() {
        let base = ProofBinding::new(PROMPT, ARTIFACT, CREATOR, TS).combined_hash;

        let variants = [
            ProofBinding::new("a red cube.", ARTIFACT, CREATOR, TS),
            ProofBinding::new(PROMPT, b"PNGDATB", CREATOR, TS),
            ProofBinding::new(PROMPT, ARTIFACT, "0xABD", TS),
            ProofBinding::new(PROMPT, ARTIFACT, CREATOR, TS + 1),
        ];

        for variant in &variants {
            assert_ne!(variant.combined_hash, base, "changed input must change hash");
        }
    }

    #[test]
    fn test_swapped_hash_order_produces_different_binding() {
        let p = prompt_hash(PROMPT);
        let o = output_hash(ARTIFACT);

        let correct = binding_hash(&p, &o, CREATOR, TS);
        let swapped = binding_hash(&o, &p, CREATOR, TS);

        assert_ne!(correct, swapped);
    }

    #[test]
    fn test_empty_inputs_hash_like_any_other() {
        let binding = ProofBinding::new("", b"", CREATOR, TS);
        // sha256 of the empty string
        let empty = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
        assert_eq!(binding.prompt_hash.to_hex(), empty);
        assert_eq!(binding.output_hash.to_hex(), empty);
        assert!(binding.is_consistent());
    }

    #[test]
    fn test_tampered_binding_is_inconsistent() {
        let mut binding = ProofBinding::new(PROMPT, ARTIFACT, CREATOR, TS);
        binding.timestamp += 1;
        assert!(!binding.is_consistent());
    }

    #[test]
    fn test_covers_artifact() {
        let binding = ProofBinding::new(PROMPT, ARTIFACT, CREATOR, TS);
        assert!(binding.covers_artifact(ARTIFACT));
        assert!(!binding.covers_artifact(b"PNGDATA\n"));
    }

    #[test]
    fn test_from_hex_accepts_prefix_and_uppercase() {
        let h = prompt_hash(PROMPT);
        let upper = format!("0x{}", h.to_hex().to_uppercase());
        assert_eq!(Sha256Hash::from_hex(&upper).unwrap(), h);
    }

    #[test]
    fn test_from_hex_rejects_malformed() {
        assert!(Sha256Hash::from_hex("").is_err());
        assert!(Sha256Hash::from_hex("abc").is_err());
        assert!(Sha256Hash::from_hex(&"z".repeat(64)).is_err());
        assert!(Sha256Hash::from_hex(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_binding_serializes_camel_case_hex() {
        let binding = ProofBinding::new(PROMPT, ARTIFACT, CREATOR, TS);
        let json = serde_json::to_value(&binding).unwrap();
        assert_eq!(json["promptHash"], binding.prompt_hash.to_hex());
        assert_eq!(json["combinedHash"], binding.combined_hash.to_hex());
        assert_eq!(json["creatorAddress"], CREATOR);
        assert_eq!(json["timestamp"], TS);

        let restored: ProofBinding = serde_json::from_value(json).unwrap();
        assert_eq!(restored, binding);
    }
}
