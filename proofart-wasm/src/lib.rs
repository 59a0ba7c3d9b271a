//! WebAssembly bindings for Proof-of-Art.
//!
//! Lets a browser re-derive and check a combined hash from an artifact and
//! its certificate without uploading the file anywhere. Ledger lookups stay
//! on the server.

use proofart_core::{output_hash, prompt_hash, Certificate, ProofBinding};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Result of checking a file against its certificate.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingCheck {
    /// The file matches and the combined hash re-derives
    pub valid: bool,
    /// SHA-256 of the file equals the certificate's output hash
    pub content_matches: bool,
    /// The certificate's combined hash matches its other fields
    pub binding_consistent: bool,
    /// Hex output hash of the supplied file
    pub output_hash: String,
    /// Hex output hash recorded in the certificate
    pub expected_output_hash: String,
    pub combined_hash: String,
    pub creator: String,
    /// Binding time (ISO 8601)
    pub timestamp: String,
    pub error: Option<String>,
}

impl BindingCheck {
    fn failed(error: String) -> Self {
        Self {
            valid: false,
            content_matches: false,
            binding_consistent: false,
            output_hash: String::new(),
            expected_output_hash: String::new(),
            combined_hash: String::new(),
            creator: String::new(),
            timestamp: String::new(),
            error: Some(error),
        }
    }
}

/// Hex SHA-256 of an artifact.
#[wasm_bindgen]
pub fn compute_output_hash(file_bytes: &[u8]) -> String {
    output_hash(file_bytes).to_hex()
}

/// Hex SHA-256 of a prompt's UTF-8 bytes.
#[wasm_bindgen]
pub fn compute_prompt_hash(prompt: &str) -> String {
    prompt_hash(prompt).to_hex()
}

/// Build the full binding and return it as JSON.
#[wasm_bindgen]
pub fn compute_binding(
    prompt: &str,
    file_bytes: &[u8],
    creator: &str,
    timestamp_ms: u64,
) -> String {
    let binding = ProofBinding::new(prompt, file_bytes, creator, timestamp_ms);
    serde_json::to_string(&binding)
        .unwrap_or_else(|e| format!(r#"{{"error":"Serialization error: {}"}}"#, e))
}

/// Check a file against its certificate (the `.proof.json` contents).
///
/// # Returns
/// A JSON string containing a [`BindingCheck`]
#[wasm_bindgen]
pub fn check_binding(certificate_json: &str, file_bytes: &[u8]) -> String {
    let result = check_internal(certificate_json, file_bytes).unwrap_or_else(BindingCheck::failed);
    serde_json::to_string(&result)
        .unwrap_or_else(|_| r#"{"valid":false,"error":"Unknown error"}"#.to_string())
}

fn check_internal(certificate_json: &str, file_bytes: &[u8]) -> Result<BindingCheck, String> {
    let certificate: Certificate = serde_json::from_str(certificate_json)
        .map_err(|e| format!("Failed to parse certificate: {}", e))?;
    let binding = &certificate.binding;

    let content_matches = binding.covers_artifact(file_bytes);
    let binding_consistent = binding.is_consistent();

    Ok(BindingCheck {
        valid: content_matches && binding_consistent,
        content_matches,
        binding_consistent,
        output_hash: output_hash(file_bytes).to_hex(),
        expected_output_hash: binding.output_hash.to_hex(),
        combined_hash: binding.combined_hash.to_hex(),
        creator: binding.creator_address.clone(),
        timestamp: format_timestamp(binding.timestamp),
        error: None,
    })
}

fn format_timestamp(timestamp_ms: u64) -> String {
    use chrono::{TimeZone, Utc};
    let secs = (timestamp_ms / 1000) as i64;
    let nsecs = ((timestamp_ms % 1000) * 1_000_000) as u32;
    match Utc.timestamp_opt(secs, nsecs) {
        chrono::LocalResult::Single(dt) => dt.to_rfc3339(),
        _ => format!("{}ms", timestamp_ms),
    }
}

/// Get the library version.
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
