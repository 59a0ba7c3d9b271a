//! Content-addressable storage for artifacts and their metadata.
//!
//! ## Providers
//!
//! - **Pinata** - pinning service, selected when the API URL contains `pinata.cloud`
//! - **IPFS node** - any node exposing the `/api/v0/add` endpoint
//! - **In-memory** - content ids derived from SHA-256, for tests
//!
//! A store that is not configured at all is represented by
//! [`UnavailableContentStore`]; the pipeline turns its error into the
//! `not-available` sentinel rather than `upload-failed`.

mod ipfs_node;
mod memory;
mod pinata;

pub use ipfs_node::IpfsNodeStore;
pub use memory::InMemoryContentStore;
pub use pinata::PinataStore;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::certificate::ContentRef;
use crate::error::StoreError;

pub const DEFAULT_IPFS_API_URL: &str = "https://ipfs.infura.io:5001/api/v0";
pub const DEFAULT_IPFS_GATEWAY: &str = "https://ipfs.io/ipfs/";
pub const PINATA_GATEWAY: &str = "https://gateway.pinata.cloud/ipfs/";

/// Default timeout for a single upload.
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Trait for content-addressable stores.
///
/// Implementations must be thread-safe (`Send + Sync`) and must report every
/// failure as a [`StoreError`].
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Upload raw bytes under `name` and return the content id.
    async fn upload(&self, bytes: &[u8], name: &str) -> Result<String, StoreError>;

    /// Upload a JSON document under `name` and return the content id.
    async fn upload_json(&self, document: &Value, name: &str) -> Result<String, StoreError>;

    /// Gateway base used to build retrievable URLs, if any.
    fn gateway(&self) -> Option<&str>;

    fn provider(&self) -> StoreProvider;
}

/// Identifies a storage provider in logs and health output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreProvider {
    Pinata,
    IpfsNode,
    InMemory,
    Unavailable,
}

impl std::fmt::Display for StoreProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pinata => write!(f, "pinata"),
            Self::IpfsNode => write!(f, "ipfs-node"),
            Self::InMemory => write!(f, "in-memory"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Build a retrievable URL for a content reference.
///
/// Sentinel references have no URL.
pub fn gateway_url(gateway: &str, content: &ContentRef) -> Option<String> {
    content.content_id().map(|id| {
        if gateway.ends_with('/') {
            format!("{gateway}{id}")
        } else {
            format!("{gateway}/{id}")
        }
    })
}

/// Content-store settings.
#[derive(Clone)]
pub struct StoreConfig {
    /// `None` when `IPFS_API_URL` is unset.
    pub api_url: Option<String>,
    /// `Bearer <jwt>` for Pinata, `user:secret` for basic auth against a node.
    pub auth: Option<String>,
    pub gateway: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("api_url", &self.api_url)
            .field("auth", &self.auth.as_ref().map(|_| "[REDACTED]"))
            .field("gateway", &self.gateway)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            auth: None,
            gateway: DEFAULT_IPFS_GATEWAY.to_string(),
            timeout: DEFAULT_UPLOAD_TIMEOUT,
        }
    }
}

impl StoreConfig {
    /// Load from `IPFS_API_URL`, `IPFS_AUTH`, `IPFS_GATEWAY`.
    pub fn from_env() -> Self {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        Self {
            api_url: non_empty("IPFS_API_URL"),
            auth: non_empty("IPFS_AUTH"),
            gateway: non_empty("IPFS_GATEWAY").unwrap_or_else(|| DEFAULT_IPFS_GATEWAY.to_string()),
            timeout: DEFAULT_UPLOAD_TIMEOUT,
        }
    }

    /// A store with neither an API URL nor credentials is not available.
    pub fn is_available(&self) -> bool {
        self.api_url.is_some() || self.auth.is_some()
    }

    pub fn effective_api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_IPFS_API_URL)
    }

    pub fn provider(&self) -> StoreProvider {
        if !self.is_available() {
            StoreProvider::Unavailable
        } else if self.effective_api_url().contains("pinata.cloud") {
            StoreProvider::Pinata
        } else {
            StoreProvider::IpfsNode
        }
    }

    /// Gateway for retrievable URLs: Pinata's own gateway for Pinata.
    pub fn effective_gateway(&self) -> &str {
        match self.provider() {
            StoreProvider::Pinata => PINATA_GATEWAY,
            _ => &self.gateway,
        }
    }
}

/// Store used when no provider is configured. Every upload fails with
/// [`StoreError::Unavailable`].
#[derive(Debug, Clone)]
pub struct UnavailableContentStore {
    reason: String,
}

impl UnavailableContentStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ContentStore for UnavailableContentStore {
    async fn upload(&self, _bytes: &[u8], _name: &str) -> Result<String, StoreError> {
        Err(StoreError::Unavailable(self.reason.clone()))
    }

    async fn upload_json(&self, _document: &Value, _name: &str) -> Result<String, StoreError> {
        Err(StoreError::Unavailable(self.reason.clone()))
    }

    fn gateway(&self) -> Option<&str> {
        None
    }

    fn provider(&self) -> StoreProvider {
        StoreProvider::Unavailable
    }
}

/// Factory for creating content stores.
pub struct ContentStoreFactory;

impl ContentStoreFactory {
    /// Build the configured store.
    ///
    /// Never fails: a store that cannot be constructed is reported as
    /// unavailable so uploads degrade instead of blocking startup.
    pub fn create(config: &StoreConfig) -> Arc<dyn ContentStore> {
        let built = match config.provider() {
            StoreProvider::Unavailable => Err(
                "IPFS not configured. Set IPFS_API_URL and IPFS_AUTH to store artifacts".to_string(),
            ),
            StoreProvider::Pinata => {
                PinataStore::new(config).map(|s| Arc::new(s) as Arc<dyn ContentStore>)
            }
            _ => IpfsNodeStore::new(config).map(|s| Arc::new(s) as Arc<dyn ContentStore>),
        };

        match built {
            Ok(store) => {
                info!(provider = %store.provider(), "Content store configured");
                store
            }
            Err(reason) => {
                warn!(reason = %reason, "Content store not available");
                Arc::new(UnavailableContentStore::new(reason))
            }
        }
    }

    /// Create an in-memory store for testing.
    pub fn create_in_memory() -> Arc<InMemoryContentStore> {
        Arc::new(InMemoryContentStore::new())
    }
}

/// MIME type for an upload name.
pub(crate) fn mime_for(name: &str) -> &'static str {
    match name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "json" => "application/json",
        _ => "application/octet-stream",
    }
}

/// Map a transport error to a [`StoreError`].
pub(crate) fn transport_error(e: reqwest::Error, timeout: Duration) -> StoreError {
    if e.is_timeout() {
        StoreError::Timeout {
            secs: timeout.as_secs(),
        }
    } else {
        StoreError::Upload(e.to_string())
    }
}
