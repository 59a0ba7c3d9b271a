//! Client for a self-hosted (or hosted) IPFS node HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::{mime_for, transport_error, ContentStore, StoreConfig, StoreProvider};
use crate::error::StoreError;
use crate::http_client::{build_client, error_message, HttpConfig};

#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: Option<String>,
}

/// Uploads through `POST {api}/add`.
pub struct IpfsNodeStore {
    client: Client,
    api_url: String,
    /// Precomputed `Authorization` header value, if any.
    authorization: Option<String>,
    gateway: String,
    timeout: Duration,
}

impl std::fmt::Debug for IpfsNodeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpfsNodeStore")
            .field("api_url", &self.api_url)
            .field("authorization", &self.authorization.as_ref().map(|_| "[REDACTED]"))
            .field("gateway", &self.gateway)
            .finish()
    }
}

impl IpfsNodeStore {
    pub fn new(config: &StoreConfig) -> Result<Self, String> {
        let api_url = config.effective_api_url().trim_end_matches('/').to_string();
        let client = build_client(&HttpConfig::new(config.timeout, false))?;

        debug!(api_url = %api_url, "IPFS node client created");
        Ok(Self {
            client,
            api_url,
            authorization: config.auth.as_deref().map(authorization_header),
            gateway: config.effective_gateway().to_string(),
            timeout: config.timeout,
        })
    }

    async fn add(&self, bytes: Vec<u8>, name: &str) -> Result<String, StoreError> {
        let part = Part::bytes(bytes)
            .file_name(name.to_string())
            .mime_str(mime_for(name))
            .map_err(|e| StoreError::Upload(e.to_string()))?;

        let mut request = self
            .client
            .post(format!("{}/add", self.api_url))
            .multipart(Form::new().part("file", part));
        if let Some(auth) = &self.authorization {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "IPFS node request failed");
            transport_error(e, self.timeout)
        })?;

        if !response.status().is_success() {
            let message = error_message(response).await;
            return Err(StoreError::Upload(format!("Failed to upload to IPFS: {message}")));
        }

        let parsed: AddResponse = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;

        parsed
            .hash
            .filter(|h| !h.is_empty())
            .ok_or_else(|| StoreError::InvalidResponse("missing Hash".into()))
    }
}

/// `Bearer` tokens pass through; anything else is `user:secret` for basic auth.
fn authorization_header(auth: &str) -> String {
    if auth.starts_with("Bearer ") {
        auth.to_string()
    } else {
        format!("Basic {}", BASE64.encode(auth))
    }
}

#[async_trait]
impl ContentStore for IpfsNodeStore {
    #[instrument(level = "info", skip(self, bytes), fields(provider = "ipfs-node", size = bytes.len()))]
    async fn upload(&self, bytes: &[u8], name: &str) -> Result<String, StoreError> {
        let id = self.add(bytes.to_vec(), name).await?;
        info!(content_id = %id, "File added");
        Ok(id)
    }

    #[instrument(level = "info", skip(self, document), fields(provider = "ipfs-node"))]
    async fn upload_json(&self, document: &Value, name: &str) -> Result<String, StoreError> {
        let pretty = serde_json::to_vec_pretty(document)
            .map_err(|e| StoreError::Upload(format!("Failed to encode metadata: {e}")))?;
        let id = self.add(pretty, name).await?;
        info!(content_id = %id, "Metadata added");
        Ok(id)
    }

    fn gateway(&self) -> Option<&str> {
        Some(&self.gateway)
    }

    fn provider(&self) -> StoreProvider {
        StoreProvider::IpfsNode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_auth_header() {
        assert_eq!(authorization_header("user:secret"), "Basic dXNlcjpzZWNyZXQ=");
    }

    #[test]
    fn test_bearer_passthrough() {
        assert_eq!(authorization_header("Bearer abc"), "Bearer abc");
    }

    #[test]
    fn test_add_response_parsing() {
        let parsed: AddResponse =
            serde_json::from_str(r#"{"Name":"output-1.png","Hash":"QmNode","Size":"12"}"#).unwrap();
        assert_eq!(parsed.hash.as_deref(), Some("QmNode"));
    }

    #[test]
    fn test_new_uses_default_api_url() {
        let store = IpfsNodeStore::new(&StoreConfig {
            auth: Some("user:secret".into()),
            ..StoreConfig::default()
        })
        .unwrap();
        assert_eq!(store.api_url, super::super::DEFAULT_IPFS_API_URL);
        assert!(format!("{store:?}").contains("[REDACTED]"));
    }
}
