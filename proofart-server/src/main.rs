//! Proof-of-Art Server - REST API for artifact attestation
//!
//! Exposes proofart-core functionality via HTTP endpoints:
//! - POST /generate - Generate, store and register an artifact
//! - POST /verify - Verify a proof by hash or by file
//! - GET /health, GET /ready - Monitoring
//! - GET /docs - Swagger UI

use std::net::SocketAddr;

use proofart_server::{create_router_with_state, AppState, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("proofart_server=info,proofart_core=info,tower_http=info")
            }),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(
        generation = ?config.generation,
        store = ?config.store,
        ledger = ?config.ledger,
        mock_backends = config.allow_mock_backends,
        "Configuration loaded"
    );

    let state = AppState::from_config(&config);
    let app = create_router_with_state(&config, state);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Proof-of-Art API listening on http://{}", addr);
    tracing::info!("Swagger UI at http://{}/docs", addr);

    // Peer addresses are needed by the rate limiter's key extractor
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
