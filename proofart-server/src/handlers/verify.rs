//! Proof verification handler
//!
//! Handles POST /verify requests. Accepts JSON or multipart/form-data.

use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
    Json,
};
use proofart_core::{output_hash, ArtifactClaim, ArtifactVerification, AttestationResult};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::multipart::MultipartFields;
use crate::state::AppState;
use crate::validation::decode_file;

const MISSING_INPUT: &str = "File or combined hash is required";

/// Verification request (JSON form)
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    /// Combined hash to look up on the ledger
    pub combined_hash: Option<String>,
    /// Base64-encoded artifact (also accepted as `fileBytesBase64`)
    #[serde(alias = "fileBytesBase64")]
    pub file: Option<String>,
    /// Prompt hash from the certificate; enables full re-derivation with `file`
    pub prompt_hash: Option<String>,
    /// Creator from the certificate; defaults to the ledger's record
    pub creator_address: Option<String>,
    /// Binding timestamp in ms from the certificate; defaults to the ledger's record
    pub timestamp: Option<u64>,
}

/// Response for verification
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub success: bool,
    /// Absent for a hash-only answer, which checks nothing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    /// Ledger record for a lookup by combined hash
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub proof: Option<AttestationResult>,
    /// Outcome of a full re-derivation from the file
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub verification: Option<ArtifactVerification>,
    /// SHA-256 of the uploaded file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Normalized verification input, whatever the request encoding.
#[derive(Debug, Default)]
struct VerifyInput {
    file: Option<Vec<u8>>,
    combined_hash: Option<String>,
    prompt_hash: Option<String>,
    creator_address: Option<String>,
    timestamp: Option<u64>,
}

impl VerifyInput {
    fn from_json(body: VerifyRequest, max_file_size: usize) -> Result<Self, ApiError> {
        let non_empty =
            |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        let file = match non_empty(body.file) {
            Some(encoded) => Some(decode_file(&encoded, max_file_size)?),
            None => None,
        };

        Ok(Self {
            file,
            combined_hash: non_empty(body.combined_hash),
            prompt_hash: non_empty(body.prompt_hash),
            creator_address: non_empty(body.creator_address),
            timestamp: body.timestamp,
        })
    }

    async fn from_multipart(
        multipart: &mut Multipart,
        max_file_size: usize,
    ) -> Result<Self, ApiError> {
        let mut fields = MultipartFields::parse(multipart, max_file_size).await?;

        let timestamp = match fields.get_text("timestamp") {
            Some(raw) => Some(raw.parse::<u64>().map_err(|_| {
                ApiError::bad_request(format!("Invalid timestamp: {}", raw))
            })?),
            None => None,
        };

        Ok(Self {
            combined_hash: fields.get_text("combinedHash").map(str::to_string),
            prompt_hash: fields.get_text("promptHash").map(str::to_string),
            creator_address: fields.get_text("creatorAddress").map(str::to_string),
            timestamp,
            file: fields.take_file(),
        })
    }
}

/// Verify a proof
///
/// Three forms, by what the request carries:
/// - **combinedHash**: look the hash up on the ledger
/// - **file + combinedHash + promptHash**: re-derive the combined hash from the
///   file and compare it with the ledger (`creatorAddress` and `timestamp`
///   default to the ledger's record)
/// - **file** alone: return the file's hash; nothing is verified
///
/// `verified: false` means no proof is registered under that hash, not an error.
#[utoipa::path(
    post,
    path = "/verify",
    tag = "Verification",
    request_body(
        content = VerifyRequest,
        description = "JSON body, or multipart/form-data with `file` and the same text fields"
    ),
    responses(
        (status = 200, description = "Verification completed", body = VerifyResponse),
        (status = 400, description = "Neither file nor combined hash, or malformed input"),
        (status = 502, description = "Ledger could not be read")
    )
)]
pub async fn verify_handler(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<VerifyResponse>, ApiError> {
    let max_file_size = state.max_upload_bytes;
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("multipart/form-data"))
        .unwrap_or(false);

    let input = if is_multipart {
        let mut multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        VerifyInput::from_multipart(&mut multipart, max_file_size).await?
    } else {
        let Json(body) = Json::<VerifyRequest>::from_request(request, &state)
            .await
            .map_err(|e| {
                ApiError::bad_request(format!("Invalid JSON in request body: {}", e.body_text()))
            })?;
        VerifyInput::from_json(body, max_file_size)?
    };

    match input {
        VerifyInput {
            file: Some(file),
            combined_hash: Some(combined_hash),
            prompt_hash: Some(prompt_hash),
            creator_address,
            timestamp,
        } => {
            let claim = ArtifactClaim {
                combined_hash,
                prompt_hash,
                creator_address,
                timestamp,
            };
            let verification = state.verifier.verify_artifact(&file, &claim).await?;

            Ok(Json(VerifyResponse {
                success: true,
                verified: Some(verification.is_authentic()),
                proof: None,
                verification: Some(verification),
                output_hash: Some(output_hash(&file).to_hex()),
                message: None,
            }))
        }
        VerifyInput {
            file,
            combined_hash: Some(combined_hash),
            ..
        } => {
            let result = state.verifier.verify_by_hash(&combined_hash).await?;

            Ok(Json(VerifyResponse {
                success: true,
                verified: Some(result.verified),
                proof: Some(result),
                verification: None,
                output_hash: file.map(|f| output_hash(&f).to_hex()),
                message: None,
            }))
        }
        VerifyInput {
            file: Some(file), ..
        } => {
            let hashed = state.verifier.compute_hash_only(&file);

            Ok(Json(VerifyResponse {
                success: true,
                verified: None,
                proof: None,
                verification: None,
                output_hash: Some(hashed.output_hash.to_hex()),
                message: Some(hashed.note),
            }))
        }
        _ => Err(ApiError::bad_request(MISSING_INPUT)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_input_accepts_file_alias() {
        let body: VerifyRequest =
            serde_json::from_str(r#"{"fileBytesBase64":"UE5HREFUQQ==","combinedHash":" "}"#)
                .unwrap();
        let input = VerifyInput::from_json(body, 1024).unwrap();
        assert_eq!(input.file.as_deref(), Some(&b"PNGDATA"[..]));
        assert_eq!(input.combined_hash, None);
    }

    #[test]
    fn test_json_input_rejects_bad_base64() {
        let body = VerifyRequest {
            file: Some("%%%".into()),
            ..VerifyRequest::default()
        };
        assert!(VerifyInput::from_json(body, 1024).is_err());
    }
}
