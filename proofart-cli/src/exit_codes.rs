//! Exit codes following sysexits.h conventions.
//!
//! These codes provide semantic meaning for different failure modes,
//! enabling scripts and CI systems to handle errors appropriately.

use proofart_core::{AttestationError, ConfigurationError, VerificationError};
use thiserror::Error;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error (malformed hash or arguments).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Data format error (proof not registered, content mismatch).
/// Maps to EX_DATAERR from sysexits.h.
pub const VERIFICATION_FAILED: i32 = 65;

/// Cannot open input file.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// Service unavailable (generation, content store, ledger).
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const NETWORK_ERROR: i32 = 69;

/// I/O error (cannot write output file).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Configuration error (missing credentials, wrong network).
/// Maps to EX_CONFIG from sysexits.h.
pub const CONFIG_ERROR: i32 = 78;

/// A verification that ran and came back negative.
#[derive(Debug, Error)]
#[error("Verification failed: {0}")]
pub struct NotVerified(pub String);

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        Self {
            code: classify(err, &message),
            message: Some(message),
        }
    }
}

fn classify(err: &anyhow::Error, message: &str) -> i32 {
    for cause in err.chain() {
        if cause.is::<NotVerified>() {
            return VERIFICATION_FAILED;
        }
        if cause.is::<ConfigurationError>() {
            return CONFIG_ERROR;
        }
        if let Some(e) = cause.downcast_ref::<VerificationError>() {
            return match e {
                VerificationError::InvalidHash(_) | VerificationError::IncompleteClaim(_) => {
                    USAGE_ERROR
                }
                VerificationError::Ledger(l) if l.is_misconfiguration() => CONFIG_ERROR,
                VerificationError::Ledger(_) => NETWORK_ERROR,
            };
        }
        if let Some(e) = cause.downcast_ref::<AttestationError>() {
            return match e {
                AttestationError::InvalidRequest(_) => USAGE_ERROR,
                AttestationError::Configuration(_) => CONFIG_ERROR,
                AttestationError::Generation(_) => NETWORK_ERROR,
            };
        }
    }

    // File errors carry their direction in the context message
    if message.contains("Failed to read") {
        INPUT_ERROR
    } else if message.contains("Failed to write") || message.contains("serialize") {
        IO_ERROR
    } else {
        GENERAL_ERROR
    }
}
