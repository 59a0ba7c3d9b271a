//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

pub mod generate;
pub mod health;
pub mod verify;

pub use crate::state::AppState;
pub use generate::{generate_handler, GenerateRequest, GenerateResponse, ProofView};
pub use health::{health, ready, HealthResponse, ReadyResponse};
pub use verify::{verify_handler, VerifyRequest, VerifyResponse};
