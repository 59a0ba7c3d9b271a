use thiserror::Error;

/// Missing or unusable credentials for an external service.
///
/// Detected before any pipeline stage runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ConfigurationError(pub String);

/// Failure of the external generation service. Fatal for the pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("{0}")]
    Upstream(String),

    #[error("generation timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("{0}")]
    EmptyResult(String),
}

/// Failure of a content-store upload. Degrades one content id.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("content store not available: {0}")]
    Unavailable(String),

    #[error("upload failed: {0}")]
    Upload(String),

    #[error("upload timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("unexpected store response: {0}")]
    InvalidResponse(String),
}

/// Failure of a ledger call. Degrades registration to "not registered".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Please switch to the {required} network (chain id {required_chain_id}); connected to chain id {actual_chain_id}")]
    NetworkMismatch {
        required: String,
        required_chain_id: u64,
        actual_chain_id: u64,
    },

    #[error("No contract found at address {0}. Please deploy the contract first.")]
    ContractMissing(String),

    #[error("ledger not configured: {0}")]
    NotConfigured(String),

    #[error("Ledger signer {signer} cannot register proofs for creator {creator}")]
    SignerMismatch { signer: String, creator: String },

    #[error("Transaction rejected by signer: {0}")]
    Rejected(String),

    #[error("Insufficient funds for transaction: {0}")]
    InsufficientFunds(String),

    #[error("proof {0} is already registered")]
    AlreadyRegistered(String),

    #[error("ledger request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("ledger transport error: {0}")]
    Transport(String),
}

impl LedgerError {
    /// True for client-side misconfiguration rather than a transient outage.
    pub fn is_misconfiguration(&self) -> bool {
        matches!(
            self,
            Self::NetworkMismatch { .. }
                | Self::ContractMissing(_)
                | Self::NotConfigured(_)
                | Self::SignerMismatch { .. }
        )
    }
}

/// Rejected verification input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Invalid hash: {0}")]
    InvalidHash(String),

    #[error("Incomplete claim: {0}")]
    IncompleteClaim(String),

    #[error("Failed to verify proof on ledger: {0}")]
    Ledger(#[from] LedgerError),
}

/// Fatal pipeline failure. The caller gets this instead of a certificate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttestationError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Image generation failed: {0}")]
    Generation(#[from] GenerationError),
}

/// Errors from binding and certificate encoding.
#[derive(Error, Debug)]
pub enum ProofError {
    #[error("Invalid hash: {0}")]
    InvalidHash(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, ProofError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_mismatch_names_required_network() {
        let err = LedgerError::NetworkMismatch {
            required: "sepolia".into(),
            required_chain_id: 11155111,
            actual_chain_id: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("sepolia"));
        assert!(msg.contains("11155111"));
        assert!(err.is_misconfiguration());
    }

    #[test]
    fn test_transient_ledger_errors_are_not_misconfiguration() {
        assert!(!LedgerError::Transport("connection reset".into()).is_misconfiguration());
        assert!(!LedgerError::Timeout { secs: 30 }.is_misconfiguration());
        assert!(!LedgerError::Rejected("user denied".into()).is_misconfiguration());
    }

    #[test]
    fn test_generation_cause_is_preserved_verbatim() {
        let err = AttestationError::from(GenerationError::Upstream(
            "Stability AI error: insufficient balance".into(),
        ));
        assert_eq!(
            err.to_string(),
            "Image generation failed: Stability AI error: insufficient balance"
        );
    }
}
