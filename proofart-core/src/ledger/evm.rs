//! EVM contract client for the `ProofOfArt` registry.

use std::future::Future;
use std::time::Duration;

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::{LedgerAttestation, LedgerClient, LedgerConfig, RegistrationRequest};
use crate::binding::Sha256Hash;
use crate::error::LedgerError;

sol! {
    #[sol(rpc)]
    interface IProofOfArt {
        function registerProof(
            string promptHash,
            string outputHash,
            string combinedHash,
            string ipfsLink
        ) external;

        function verifyProof(string combinedHash)
            external
            view
            returns (bool exists, address creator, uint256 timestamp, string ipfsLink);
    }
}

/// Registry contract reached over JSON-RPC.
///
/// Reads need only the contract address; registration also needs a signer,
/// and that signer must be the binding's creator. The contract records
/// `msg.sender` as creator and the block time (seconds) as timestamp.
pub struct EvmLedger {
    rpc_url: Url,
    contract: Address,
    signer: Option<PrivateKeySigner>,
    chain_id: u64,
    network_name: String,
    timeout: Duration,
}

impl std::fmt::Debug for EvmLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmLedger")
            .field("rpc_url", &self.rpc_url.as_str())
            .field("contract", &self.contract)
            .field("signer", &self.signer.as_ref().map(|s| s.address()))
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

impl EvmLedger {
    pub fn new(config: &LedgerConfig) -> Result<Self, LedgerError> {
        let address = config
            .contract_address
            .as_deref()
            .ok_or_else(|| LedgerError::NotConfigured("LEDGER_CONTRACT_ADDRESS not set".into()))?;

        let contract: Address = address.trim().parse().map_err(|e| {
            LedgerError::NotConfigured(format!("Invalid contract address {address}: {e}"))
        })?;

        let rpc_url = Url::parse(&config.rpc_url)
            .map_err(|e| LedgerError::NotConfigured(format!("Invalid RPC URL: {e}")))?;

        let signer = config
            .private_key
            .as_ref()
            .map(|key| {
                key.trim()
                    .parse::<PrivateKeySigner>()
                    .map_err(|e| LedgerError::NotConfigured(format!("Invalid private key: {e}")))
            })
            .transpose()?;

        if let Some(signer) = &signer {
            debug!(signer = %signer.address(), "Ledger signer loaded");
        }

        Ok(Self {
            rpc_url,
            contract,
            signer,
            chain_id: config.chain_id,
            network_name: config.network_name.clone(),
            timeout: config.timeout,
        })
    }

    /// Address used as `msg.sender` for registrations.
    pub fn signer_address(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, LedgerError>
    where
        F: Future<Output = Result<T, LedgerError>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| LedgerError::Timeout {
                secs: self.timeout.as_secs(),
            })?
    }

    async fn connected_chain_id(&self) -> Result<u64, LedgerError> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        self.bounded(async {
            provider
                .get_chain_id()
                .await
                .map_err(|e| LedgerError::Transport(format!("Failed to read chain id: {e}")))
        })
        .await
    }

    async fn ensure_contract_deployed(&self) -> Result<(), LedgerError> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        let code = self
            .bounded(async {
                provider
                    .get_code_at(self.contract)
                    .await
                    .map_err(|e| LedgerError::Transport(format!("Failed to read contract code: {e}")))
            })
            .await?;

        if code.is_empty() {
            return Err(LedgerError::ContractMissing(self.contract.to_string()));
        }
        Ok(())
    }
}

/// The contract records `msg.sender`, so only the creator's own key may register.
fn ensure_signer_is_creator(signer: Address, creator: &str) -> Result<(), LedgerError> {
    if signer.to_string().eq_ignore_ascii_case(creator.trim()) {
        return Ok(());
    }
    Err(LedgerError::SignerMismatch {
        signer: signer.to_string(),
        creator: creator.to_string(),
    })
}

/// Sort a node or signer error message into the ledger error taxonomy.
fn classify(message: String, combined_hash: &Sha256Hash) -> LedgerError {
    let lower = message.to_lowercase();
    if lower.contains("insufficient funds") {
        LedgerError::InsufficientFunds(message)
    } else if lower.contains("already") && (lower.contains("registered") || lower.contains("exists")) {
        LedgerError::AlreadyRegistered(combined_hash.to_hex())
    } else if lower.contains("rejected") || lower.contains("denied") {
        LedgerError::Rejected(message)
    } else {
        LedgerError::Transport(message)
    }
}

#[async_trait]
impl LedgerClient for EvmLedger {
    #[instrument(level = "info", skip(self, request), fields(combined_hash = %request.combined_hash, network = %self.network_name))]
    async fn register(&self, request: &RegistrationRequest) -> Result<String, LedgerError> {
        let signer = self.signer.clone().ok_or_else(|| {
            LedgerError::NotConfigured("LEDGER_PRIVATE_KEY not set; cannot sign registrations".into())
        })?;
        ensure_signer_is_creator(signer.address(), &request.creator_address)?;

        self.check_network().await?;
        self.ensure_contract_deployed().await?;

        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(EthereumWallet::from(signer))
            .on_http(self.rpc_url.clone());
        let contract = IProofOfArt::new(self.contract, &provider);

        let receipt = self
            .bounded(async {
                let pending = contract
                    .registerProof(
                        request.prompt_hash.to_hex(),
                        request.output_hash.to_hex(),
                        request.combined_hash.to_hex(),
                        request.output_content_id.as_str().to_string(),
                    )
                    .send()
                    .await
                    .map_err(|e| classify(e.to_string(), &request.combined_hash))?;

                debug!(tx = %pending.tx_hash(), "Transaction sent");

                pending
                    .get_receipt()
                    .await
                    .map_err(|e| LedgerError::Transport(format!("Failed to get receipt: {e}")))
            })
            .await?;

        if !receipt.status() {
            warn!(tx = %receipt.transaction_hash, "Registration reverted");
            return Err(LedgerError::Transport(format!(
                "Registration transaction {} reverted",
                receipt.transaction_hash
            )));
        }

        info!(
            tx = %receipt.transaction_hash,
            block = receipt.block_number.unwrap_or(0),
            "Proof registered"
        );
        Ok(receipt.transaction_hash.to_string())
    }

    #[instrument(level = "debug", skip(self), fields(combined_hash = %combined_hash))]
    async fn verify(&self, combined_hash: &Sha256Hash) -> Result<LedgerAttestation, LedgerError> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        let contract = IProofOfArt::new(self.contract, &provider);

        let record = self
            .bounded(async {
                contract
                    .verifyProof(combined_hash.to_hex())
                    .call()
                    .await
                    .map_err(|e| LedgerError::Transport(format!("Contract call failed: {e}")))
            })
            .await?;

        if !record.exists {
            return Ok(LedgerAttestation::not_found());
        }

        // Block time is in seconds
        let timestamp = u64::try_from(record.timestamp)
            .ok()
            .and_then(|secs| secs.checked_mul(1000))
            .ok_or_else(|| LedgerError::Transport("Ledger timestamp out of range".into()))?;

        Ok(LedgerAttestation {
            exists: true,
            creator: record.creator.to_string(),
            timestamp,
            output_content_id: record.ipfsLink,
        })
    }

    async fn check_network(&self) -> Result<u64, LedgerError> {
        let actual = self.connected_chain_id().await?;
        if actual != self.chain_id {
            warn!(
                required = %self.network_name,
                required_chain_id = self.chain_id,
                actual_chain_id = actual,
                "Connected to the wrong network"
            );
            return Err(LedgerError::NetworkMismatch {
                required: self.network_name.clone(),
                required_chain_id: self.chain_id,
                actual_chain_id: actual,
            });
        }
        Ok(actual)
    }

    fn network_name(&self) -> &str {
        &self.network_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zeroize::Zeroizing;

    // Well-known development key (anvil/hardhat account #0)
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn config() -> LedgerConfig {
        LedgerConfig {
            contract_address: Some("0x5FbDB2315678afecb367f032d93F642f64180aa3".into()),
            private_key: Some(Zeroizing::new(DEV_KEY.into())),
            chain_id: 31_337,
            network_name: "localhost".into(),
            ..LedgerConfig::default()
        }
    }

    #[test]
    fn test_new_parses_signer() {
        let ledger = EvmLedger::new(&config()).unwrap();
        assert_eq!(
            ledger.signer_address().unwrap().to_string(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
        assert!(!format!("{ledger:?}").contains("ac0974bec"));
    }

    #[test]
    fn test_invalid_address_is_not_configured() {
        let mut cfg = config();
        cfg.contract_address = Some("not-an-address".into());
        let err = EvmLedger::new(&cfg).unwrap_err();
        assert!(matches!(err, LedgerError::NotConfigured(_)));
    }

    #[test]
    fn test_invalid_key_is_not_configured() {
        let mut cfg = config();
        cfg.private_key = Some(Zeroizing::new("0x1234".into()));
        assert!(EvmLedger::new(&cfg).is_err());
    }

    #[test]
    fn test_read_only_without_key() {
        let mut cfg = config();
        cfg.private_key = None;
        let ledger = EvmLedger::new(&cfg).unwrap();
        assert!(ledger.signer_address().is_none());
    }

    #[test]
    fn test_error_classification() {
        let hash = Sha256Hash::digest(b"x");
        assert!(matches!(
            classify("insufficient funds for gas * price + value".into(), &hash),
            LedgerError::InsufficientFunds(_)
        ));
        assert!(matches!(
            classify("execution reverted: Proof already exists".into(), &hash),
            LedgerError::AlreadyRegistered(_)
        ));
        assert!(matches!(
            classify("user rejected transaction".into(), &hash),
            LedgerError::Rejected(_)
        ));
        assert!(matches!(
            classify("connection refused".into(), &hash),
            LedgerError::Transport(_)
        ));
    }

    #[test]
    fn test_signer_must_be_creator() {
        let signer = EvmLedger::new(&config()).unwrap().signer_address().unwrap();

        for creator in [
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
            "0xF39FD6E51AAD88F6F4CE6AB8827279CFFFB92266",
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
        ] {
            assert!(ensure_signer_is_creator(signer, creator).is_ok());
        }

        let err = ensure_signer_is_creator(signer, "0xABC").unwrap_err();
        assert!(matches!(err, LedgerError::SignerMismatch { .. }));
        assert!(err.is_misconfiguration());
    }

    #[tokio::test]
    async fn test_register_for_other_creator_fails_before_network() {
        let mut cfg = config();
        cfg.rpc_url = "http://127.0.0.1:1".into();
        let ledger = EvmLedger::new(&cfg).unwrap();

        let binding = crate::binding::ProofBinding::new("p", b"o", "0xABC", 1);
        let request =
            RegistrationRequest::new(&binding, &crate::certificate::ContentRef::Unavailable);
        let err = ledger.register(&request).await.unwrap_err();
        assert!(matches!(err, LedgerError::SignerMismatch { .. }));
        assert!(!ledger.records_binding_fields());
    }

    #[tokio::test]
    async fn test_register_without_signer_fails_before_network() {
        let mut cfg = config();
        cfg.private_key = None;
        // Unroutable port: would fail with Transport if the network were touched
        cfg.rpc_url = "http://127.0.0.1:1".into();
        let ledger = EvmLedger::new(&cfg).unwrap();

        let binding = crate::binding::ProofBinding::new("p", b"o", "0x1", 1);
        let request =
            RegistrationRequest::new(&binding, &crate::certificate::ContentRef::Unavailable);
        let err = ledger.register(&request).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotConfigured(_)));
    }
}
