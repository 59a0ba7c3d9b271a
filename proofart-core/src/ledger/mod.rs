//! Ledger clients: register a binding hash and look it up later.
//!
//! The on-chain schema is `ProofOfArt v1`:
//!
//! ```text
//! registerProof(string promptHash, string outputHash, string combinedHash, string ipfsLink)
//! verifyProof(string combinedHash) view returns (bool exists, address creator, uint256 timestamp, string ipfsLink)
//! ```
//!
//! Hashes travel as lowercase hex strings without a `0x` prefix.

mod evm;
mod memory;

pub use evm::EvmLedger;
pub use memory::InMemoryLedger;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::binding::{ProofBinding, Sha256Hash};
use crate::certificate::ContentRef;
use crate::error::LedgerError;

/// Version tag of the on-chain record layout.
pub const SCHEMA_VERSION: &str = "ProofOfArt v1";

pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";
pub const DEFAULT_CHAIN_ID: u64 = 11_155_111;
pub const DEFAULT_LEDGER_TIMEOUT: Duration = Duration::from_secs(60);

/// Arguments of one `registerProof` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub prompt_hash: Sha256Hash,
    pub output_hash: Sha256Hash,
    pub combined_hash: Sha256Hash,
    pub output_content_id: ContentRef,
    /// Address bound into the combined hash. Registrations are made on its behalf.
    pub creator_address: String,
    /// Binding timestamp. The on-chain contract stamps its own block time.
    pub timestamp: u64,
}

impl RegistrationRequest {
    pub fn new(binding: &ProofBinding, output_content_id: &ContentRef) -> Self {
        Self {
            prompt_hash: binding.prompt_hash,
            output_hash: binding.output_hash,
            combined_hash: binding.combined_hash,
            output_content_id: output_content_id.clone(),
            creator_address: binding.creator_address.clone(),
            timestamp: binding.timestamp,
        }
    }
}

/// Result of a `verifyProof` lookup. `exists == false` is a normal answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerAttestation {
    pub exists: bool,
    pub creator: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub output_content_id: String,
}

impl LedgerAttestation {
    pub fn not_found() -> Self {
        Self {
            exists: false,
            creator: String::new(),
            timestamp: 0,
            output_content_id: String::new(),
        }
    }
}

/// Trait for ledger backends.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Submit a registration and wait for it to be included. Returns the
    /// transaction id.
    async fn register(&self, request: &RegistrationRequest) -> Result<String, LedgerError>;

    /// Look up the record for `combined_hash`.
    async fn verify(&self, combined_hash: &Sha256Hash) -> Result<LedgerAttestation, LedgerError>;

    /// Compare the connected network with the configured deployment.
    ///
    /// Returns the connected chain id, or [`LedgerError::NetworkMismatch`].
    async fn check_network(&self) -> Result<u64, LedgerError>;

    /// Name of the network the ledger is deployed on.
    fn network_name(&self) -> &str;

    /// Whether records carry the creator string and binding timestamp exactly
    /// as they went into the combined hash.
    ///
    /// An on-chain record holds a checksummed `msg.sender` and the block time,
    /// which cannot re-derive a binding on their own.
    fn records_binding_fields(&self) -> bool {
        false
    }
}

/// Well-known names for chain ids.
pub fn network_name_for(chain_id: u64) -> String {
    match chain_id {
        1 => "mainnet".into(),
        11_155_111 => "sepolia".into(),
        80_001 => "mumbai".into(),
        31_337 => "localhost".into(),
        other => format!("chain-{other}"),
    }
}

/// Ledger connection settings.
#[derive(Clone)]
pub struct LedgerConfig {
    pub rpc_url: String,
    pub contract_address: Option<String>,
    pub private_key: Option<Zeroizing<String>>,
    pub chain_id: u64,
    pub network_name: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for LedgerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerConfig")
            .field("rpc_url", &self.rpc_url)
            .field("contract_address", &self.contract_address)
            .field("private_key", &self.private_key.as_ref().map(|_| "[REDACTED]"))
            .field("chain_id", &self.chain_id)
            .field("network_name", &self.network_name)
            .finish()
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            contract_address: None,
            private_key: None,
            chain_id: DEFAULT_CHAIN_ID,
            network_name: network_name_for(DEFAULT_CHAIN_ID),
            timeout: DEFAULT_LEDGER_TIMEOUT,
        }
    }
}

impl LedgerConfig {
    /// Load from `LEDGER_RPC_URL`, `LEDGER_CONTRACT_ADDRESS`,
    /// `LEDGER_PRIVATE_KEY`, `LEDGER_CHAIN_ID`, `LEDGER_NETWORK_NAME`.
    pub fn from_env() -> Self {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        let chain_id = non_empty("LEDGER_CHAIN_ID")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_CHAIN_ID);

        Self {
            rpc_url: non_empty("LEDGER_RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
            contract_address: non_empty("LEDGER_CONTRACT_ADDRESS"),
            private_key: non_empty("LEDGER_PRIVATE_KEY").map(Zeroizing::new),
            chain_id,
            network_name: non_empty("LEDGER_NETWORK_NAME")
                .unwrap_or_else(|| network_name_for(chain_id)),
            timeout: DEFAULT_LEDGER_TIMEOUT,
        }
    }

    pub fn can_read(&self) -> bool {
        self.contract_address.is_some()
    }

    pub fn can_register(&self) -> bool {
        self.contract_address.is_some() && self.private_key.is_some()
    }
}

/// Ledger used when no contract is configured. Every call fails with
/// [`LedgerError::NotConfigured`].
#[derive(Debug, Clone)]
pub struct UnconfiguredLedger {
    network_name: String,
}

impl UnconfiguredLedger {
    pub fn new(network_name: impl Into<String>) -> Self {
        Self {
            network_name: network_name.into(),
        }
    }

    fn error() -> LedgerError {
        LedgerError::NotConfigured(
            "Contract address not set. Deploy the contract and set LEDGER_CONTRACT_ADDRESS".into(),
        )
    }
}

#[async_trait]
impl LedgerClient for UnconfiguredLedger {
    async fn register(&self, _request: &RegistrationRequest) -> Result<String, LedgerError> {
        Err(Self::error())
    }

    async fn verify(&self, _combined_hash: &Sha256Hash) -> Result<LedgerAttestation, LedgerError> {
        Err(Self::error())
    }

    async fn check_network(&self) -> Result<u64, LedgerError> {
        Err(Self::error())
    }

    fn network_name(&self) -> &str {
        &self.network_name
    }
}

/// Factory for creating ledger clients.
pub struct LedgerFactory;

impl LedgerFactory {
    /// Build the configured ledger. An unusable configuration yields an
    /// [`UnconfiguredLedger`] so registrations degrade instead of blocking startup.
    pub fn create(config: &LedgerConfig) -> Arc<dyn LedgerClient> {
        if !config.can_read() {
            warn!("Ledger contract address not set; proofs will not be registered");
            return Arc::new(UnconfiguredLedger::new(config.network_name.clone()));
        }

        match EvmLedger::new(config) {
            Ok(ledger) => {
                info!(
                    network = %config.network_name,
                    chain_id = config.chain_id,
                    can_register = config.can_register(),
                    "Ledger configured"
                );
                Arc::new(ledger)
            }
            Err(e) => {
                warn!(error = %e, "Ledger configuration invalid; proofs will not be registered");
                Arc::new(UnconfiguredLedger::new(config.network_name.clone()))
            }
        }
    }

    /// Create an in-memory ledger for testing.
    pub fn create_in_memory() -> Arc<InMemoryLedger> {
        Arc::new(InMemoryLedger::new())
    }
}
