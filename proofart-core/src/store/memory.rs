//! In-memory content store for testing.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::{ContentStore, StoreProvider};
use crate::error::StoreError;

/// Keeps uploaded blobs in a map keyed by `Qm` + hex(SHA-256(bytes)).
///
/// Identical bytes always get the same id.
#[derive(Debug, Default)]
pub struct InMemoryContentStore {
    blobs: DashMap<String, Vec<u8>>,
    fail_uploads: AtomicBool,
    fail_json: AtomicBool,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `upload` call fail.
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Make every `upload_json` call fail.
    pub fn fail_json(&self, fail: bool) {
        self.fail_json.store(fail, Ordering::SeqCst);
    }

    /// Make every upload sleep before answering.
    pub fn delay_uploads(&self, delay: Duration) {
        if let Ok(mut slot) = self.delay.lock() {
            *slot = Some(delay);
        }
    }

    pub fn content_id(bytes: &[u8]) -> String {
        format!("Qm{}", hex::encode(Sha256::digest(bytes)))
    }

    pub fn get(&self, content_id: &str) -> Option<Vec<u8>> {
        self.blobs.get(content_id).map(|b| b.value().clone())
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Number of upload attempts, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn injected_delay(&self) {
        let delay = self.delay.lock().ok().and_then(|d| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn put(&self, bytes: Vec<u8>) -> String {
        let id = Self::content_id(&bytes);
        self.blobs.insert(id.clone(), bytes);
        id
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn upload(&self, bytes: &[u8], name: &str) -> Result<String, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.injected_delay().await;
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StoreError::Upload(format!("simulated failure uploading {name}")));
        }
        Ok(self.put(bytes.to_vec()))
    }

    async fn upload_json(&self, document: &Value, name: &str) -> Result<String, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.injected_delay().await;
        if self.fail_json.load(Ordering::SeqCst) {
            return Err(StoreError::Upload(format!("simulated failure uploading {name}")));
        }
        let bytes =
            serde_json::to_vec(document).map_err(|e| StoreError::Upload(e.to_string()))?;
        Ok(self.put(bytes))
    }

    fn gateway(&self) -> Option<&str> {
        Some("memory://")
    }

    fn provider(&self) -> StoreProvider {
        StoreProvider::InMemory
    }
}
