//! In-memory ledger for testing.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{LedgerAttestation, LedgerClient, RegistrationRequest};
use crate::binding::Sha256Hash;
use crate::error::LedgerError;

const CHAIN_ID: u64 = 31_337;

/// Map from combined hash to record. Records are never overwritten.
///
/// Each registration is treated as signed by the binding's creator, so the
/// record carries the creator address and binding timestamp verbatim.
#[derive(Debug)]
pub struct InMemoryLedger {
    records: DashMap<Sha256Hash, LedgerAttestation>,
    failure: Mutex<Option<LedgerError>>,
    delay: Mutex<Option<Duration>>,
    connected_chain_id: AtomicU64,
    tx_counter: AtomicU64,
    registrations: AtomicUsize,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            failure: Mutex::new(None),
            delay: Mutex::new(None),
            connected_chain_id: AtomicU64::new(CHAIN_ID),
            tx_counter: AtomicU64::new(0),
            registrations: AtomicUsize::new(0),
        }
    }

    /// Make every subsequent `register` call fail with `error`.
    pub fn fail_with(&self, error: LedgerError) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = Some(error);
        }
    }

    /// Clear a failure set with [`fail_with`](Self::fail_with).
    pub fn recover(&self) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = None;
        }
    }

    /// Make every subsequent `register` call sleep before answering.
    pub fn delay_registrations(&self, delay: Duration) {
        if let Ok(mut slot) = self.delay.lock() {
            *slot = Some(delay);
        }
    }

    /// Pretend the creator's wallet is connected to `chain_id`.
    pub fn wrong_network(&self, chain_id: u64) {
        self.connected_chain_id.store(chain_id, Ordering::SeqCst);
    }

    /// Number of `register` calls, failed ones included.
    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn injected_failure(&self) -> Option<LedgerError> {
        self.failure.lock().ok().and_then(|f| f.clone())
    }

    fn injected_delay(&self) -> Option<Duration> {
        self.delay.lock().ok().and_then(|d| *d)
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn register(&self, request: &RegistrationRequest) -> Result<String, LedgerError> {
        self.registrations.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.injected_delay() {
            tokio::time::sleep(delay).await;
        }

        self.check_network().await?;
        if let Some(error) = self.injected_failure() {
            return Err(error);
        }

        match self.records.entry(request.combined_hash) {
            Entry::Occupied(_) => {
                return Err(LedgerError::AlreadyRegistered(request.combined_hash.to_hex()));
            }
            Entry::Vacant(slot) => {
                slot.insert(LedgerAttestation {
                    exists: true,
                    creator: request.creator_address.clone(),
                    timestamp: request.timestamp,
                    output_content_id: request.output_content_id.as_str().to_string(),
                });
            }
        }

        let n = self.tx_counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("0x{n:064x}"))
    }

    async fn verify(&self, combined_hash: &Sha256Hash) -> Result<LedgerAttestation, LedgerError> {
        Ok(self
            .records
            .get(combined_hash)
            .map(|r| r.value().clone())
            .unwrap_or_else(LedgerAttestation::not_found))
    }

    async fn check_network(&self) -> Result<u64, LedgerError> {
        let actual = self.connected_chain_id.load(Ordering::SeqCst);
        if actual != CHAIN_ID {
            return Err(LedgerError::NetworkMismatch {
                required: self.network_name().to_string(),
                required_chain_id: CHAIN_ID,
                actual_chain_id: actual,
            });
        }
        Ok(actual)
    }

    fn network_name(&self) -> &str {
        "localhost"
    }

    fn records_binding_fields(&self) -> bool {
        true
    }
}
