//! Request validation module
//!
//! Provides validation utilities for creation requests and uploaded files.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use proofart_core::ArtifactKind;

use crate::error::ApiError;

/// Allowed MIME type categories for artifact uploads
const ALLOWED_MIME_PREFIXES: &[&str] = &["image/", "application/octet-stream"];

/// Message returned when a creation request lacks its required fields
pub const MISSING_FIELDS: &str = "Prompt and user address are required";

/// Returns the trimmed value, or `None` when missing or blank.
pub fn required_field(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parses the requested artifact kind; absent means image.
pub fn parse_kind(kind: Option<&str>) -> Result<ArtifactKind, ApiError> {
    match kind {
        None => Ok(ArtifactKind::default()),
        Some(raw) => raw
            .parse()
            .map_err(|other: String| ApiError::bad_request(format!("Unsupported type: {}", other))),
    }
}

/// Validates the Content-Type of an uploaded file
///
/// Accepts image/* and application/octet-stream. A missing Content-Type is
/// treated as binary.
pub fn validate_content_type(content_type: Option<&str>) -> Result<(), ApiError> {
    match content_type {
        Some(ct) => {
            let ct_lower = ct.to_lowercase();
            if ALLOWED_MIME_PREFIXES
                .iter()
                .any(|prefix| ct_lower.starts_with(prefix))
            {
                Ok(())
            } else {
                Err(ApiError::bad_request(format!(
                    "Unsupported Content-Type: '{}'. Allowed types: image/*, application/octet-stream",
                    ct
                )))
            }
        }
        None => Ok(()),
    }
}

/// Validates the size of an uploaded file
pub fn validate_file_size(size: usize, max_size: usize) -> Result<(), ApiError> {
    if size > max_size {
        let max_mb = max_size / (1024 * 1024);
        let actual_mb = size / (1024 * 1024);
        Err(ApiError::bad_request(format!(
            "File too large: {} MB exceeds maximum of {} MB",
            actual_mb, max_mb
        )))
    } else {
        Ok(())
    }
}

/// Decodes a base64 file body sent in JSON
pub fn decode_file(encoded: &str, max_size: usize) -> Result<Vec<u8>, ApiError> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| ApiError::bad_request(format!("Invalid base64 in file: {}", e)))?;
    validate_file_size(bytes.len(), max_size)?;
    Ok(bytes)
}
