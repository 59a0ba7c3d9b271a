//! Artifact creation handler
//!
//! Handles POST /generate: generate an artifact from a prompt, bind it to its
//! creator, store it and register the proof.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use proofart_core::{AttestationRequest, Certificate};
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::{parse_kind, required_field, MISSING_FIELDS};

/// Creation request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Text prompt sent to the generation service
    #[schema(example = "a red cube")]
    pub prompt: Option<String>,
    /// Creator address (also accepted as `creatorAddress`)
    #[serde(alias = "creatorAddress")]
    #[schema(example = "0xABC")]
    pub user_address: Option<String>,
    /// Artifact kind (also accepted as `kind`); only "image" is supported
    #[serde(rename = "type", alias = "kind")]
    #[schema(example = "image")]
    pub kind: Option<String>,
}

/// Hashes and storage pointers of one creation
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProofView {
    pub prompt_hash: String,
    pub output_hash: String,
    pub combined_hash: String,
    pub creator: String,
    /// Binding timestamp, milliseconds since Unix epoch
    #[schema(example = 1700000000000_u64)]
    pub timestamp: u64,
    /// Content id of the artifact, or "not-available" / "upload-failed"
    pub output_cid: String,
    /// Content id of the metadata document, or a sentinel
    pub metadata_cid: String,
    /// Ledger transaction id when registration succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    /// Base64-encoded artifact bytes
    pub output_buffer: String,
}

/// Response for a successful creation
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    /// Correlation id for logs
    pub request_id: String,
    pub proof: ProofView,
    /// Full certificate, including registration status and verification URL
    #[schema(value_type = Object)]
    pub certificate: Certificate,
    /// One entry per degraded field; empty when everything succeeded
    pub warnings: Vec<String>,
}

/// Generate an artifact and attest to it
///
/// Accepts JSON `{ prompt, userAddress, type }`. Content-store and ledger
/// failures do not fail the request: the certificate carries sentinel values
/// and `warnings` explains each one.
#[utoipa::path(
    post,
    path = "/generate",
    tag = "Creation",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Artifact generated and attested", body = GenerateResponse),
        (status = 400, description = "Missing prompt or address, or unsupported type"),
        (status = 500, description = "Generation not configured or generation failed")
    )
)]
pub async fn generate_handler(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let Json(body) = payload.map_err(|e| {
        ApiError::bad_request(format!("Invalid JSON in request body: {}", e.body_text()))
    })?;

    let (prompt, creator) = match (
        required_field(body.prompt.as_deref()),
        required_field(body.user_address.as_deref()),
    ) {
        (Some(prompt), Some(creator)) => (prompt.to_string(), creator.to_string()),
        _ => return Err(ApiError::bad_request(MISSING_FIELDS)),
    };
    let kind = parse_kind(body.kind.as_deref())?;

    let pipeline = state.pipeline.as_ref().map_err(|e| ApiError::from(e.clone()))?;

    let request_id = uuid::Uuid::new_v4().to_string();
    let request = AttestationRequest {
        prompt,
        creator_address: creator,
        kind,
    };
    let attestation = pipeline
        .attest(&request)
        .instrument(tracing::info_span!("generate", request_id = %request_id))
        .await?;

    let certificate = attestation.certificate;
    let warnings = certificate.warnings();

    let proof = ProofView {
        prompt_hash: certificate.binding.prompt_hash.to_hex(),
        output_hash: certificate.binding.output_hash.to_hex(),
        combined_hash: certificate.combined_hash().to_hex(),
        creator: certificate.binding.creator_address.clone(),
        timestamp: certificate.binding.timestamp,
        output_cid: certificate.record.output_content_id.to_string(),
        metadata_cid: certificate.record.metadata_content_id.to_string(),
        tx_hash: certificate.registration.tx_id().map(str::to_string),
        output_buffer: BASE64.encode(&attestation.artifact),
    };

    tracing::info!(
        request_id = %request_id,
        combined_hash = %proof.combined_hash,
        registered = certificate.registration.is_registered(),
        warnings = warnings.len(),
        "Artifact attested"
    );

    Ok(Json(GenerateResponse {
        success: true,
        request_id,
        proof,
        certificate,
        warnings,
    }))
}
