//! Health check handlers
//!
//! Provides health and readiness endpoints for monitoring and orchestration.

use std::time::Duration;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Upper bound for the ledger check behind /ready
const READY_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status: "healthy" or "degraded"
    #[schema(example = "healthy")]
    pub status: &'static str,
    /// Server version from Cargo.toml
    #[schema(example = "0.1.0")]
    pub version: &'static str,
    /// Service name
    #[schema(example = "proofart-server")]
    pub service: &'static str,
    /// Generation backend in use, absent when none is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "Stability AI")]
    pub generation: Option<String>,
    /// Content store receiving uploads
    #[schema(example = "pinata")]
    pub store: String,
    /// Ledger network proofs are registered on
    #[schema(example = "sepolia")]
    pub network: String,
}

/// Health check endpoint
///
/// Reports which capabilities are configured. "degraded" means /generate
/// cannot run until generation credentials are set.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service status", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.pipeline.is_ok() {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        service: "proofart-server",
        generation: state.generation_backend.map(|b| b.to_string()),
        store: state.store_provider.to_string(),
        network: state.ledger.network_name().to_string(),
    })
}

/// Readiness response
#[derive(Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Whether the service is ready to accept traffic
    pub ready: bool,
    /// Chain id the ledger client is connected to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    /// Optional message explaining status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Readiness check
///
/// Returns 200 when the ledger is reachable on the expected network,
/// 503 otherwise (including a network mismatch).
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Ready to accept traffic", body = ReadyResponse),
        (status = 503, description = "Ledger unreachable or on the wrong network", body = ReadyResponse)
    )
)]
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let check = tokio::time::timeout(READY_CHECK_TIMEOUT, state.ledger.check_network()).await;

    let message = match check {
        Ok(Ok(chain_id)) => {
            return (
                StatusCode::OK,
                Json(ReadyResponse {
                    ready: true,
                    chain_id: Some(chain_id),
                    message: None,
                }),
            )
        }
        Ok(Err(e)) => e.to_string(),
        Err(_) => format!(
            "ledger did not answer within {}s",
            READY_CHECK_TIMEOUT.as_secs()
        ),
    };

    tracing::warn!(error = %message, "Readiness check failed");
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ReadyResponse {
            ready: false,
            chain_id: None,
            message: Some(message),
        }),
    )
}
