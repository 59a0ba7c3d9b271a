//! Pinata pinning-service client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::{mime_for, transport_error, ContentStore, StoreConfig, StoreProvider, PINATA_GATEWAY};
use crate::error::StoreError;
use crate::http_client::{build_client, error_message, HttpConfig};

/// CID version requested from Pinata. v0 ids start with `Qm`.
const CID_VERSION: u8 = 0;

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: Option<String>,
}

/// Uploads through `pinning/pinFileToIPFS` and `pinning/pinJSONToIPFS`.
pub struct PinataStore {
    client: Client,
    base: Url,
    bearer: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for PinataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinataStore")
            .field("base", &self.base.as_str())
            .field("bearer", &"[REDACTED]")
            .finish()
    }
}

impl PinataStore {
    /// `IPFS_AUTH` must be `Bearer <jwt>`. Any other value builds a store
    /// whose uploads fail, so the certificate records `upload-failed`.
    pub fn new(config: &StoreConfig) -> Result<Self, String> {
        let bearer = config
            .auth
            .as_deref()
            .filter(|a| a.starts_with("Bearer "))
            .map(String::from);
        if bearer.is_none() {
            warn!("IPFS_AUTH is not a Bearer token; Pinata uploads will fail");
        }

        let base = Url::parse(config.effective_api_url())
            .map_err(|e| format!("Invalid IPFS_API_URL: {e}"))?;
        let client = build_client(&HttpConfig::new(config.timeout, base.scheme() == "https"))?;

        debug!(base = %base, "Pinata client created");
        Ok(Self {
            client,
            base,
            bearer,
            timeout: config.timeout,
        })
    }

    fn authorization(&self) -> Result<&str, StoreError> {
        self.bearer.as_deref().ok_or_else(|| {
            StoreError::Upload(
                "Pinata JWT token not found. Please set IPFS_AUTH=Bearer YOUR_JWT_TOKEN".into(),
            )
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, StoreError> {
        self.base
            .join(path)
            .map_err(|e| StoreError::Upload(format!("Invalid Pinata endpoint: {e}")))
    }

    async fn read_hash(response: reqwest::Response) -> Result<String, StoreError> {
        if !response.status().is_success() {
            let message = error_message(response).await;
            return Err(StoreError::Upload(format!("Pinata upload failed: {message}")));
        }

        let parsed: PinResponse = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;

        parsed
            .ipfs_hash
            .filter(|h| !h.is_empty())
            .ok_or_else(|| StoreError::InvalidResponse("missing IpfsHash".into()))
    }
}

#[async_trait]
impl ContentStore for PinataStore {
    #[instrument(level = "info", skip(self, bytes), fields(provider = "pinata", size = bytes.len()))]
    async fn upload(&self, bytes: &[u8], name: &str) -> Result<String, StoreError> {
        let bearer = self.authorization()?;
        let file = Part::bytes(bytes.to_vec())
            .file_name(name.to_string())
            .mime_str(mime_for(name))
            .map_err(|e| StoreError::Upload(e.to_string()))?;

        let form = Form::new()
            .part("file", file)
            .text("pinataMetadata", json!({ "name": name }).to_string())
            .text("pinataOptions", json!({ "cidVersion": CID_VERSION }).to_string());

        let response = self
            .client
            .post(self.endpoint("/pinning/pinFileToIPFS")?)
            .header(reqwest::header::AUTHORIZATION, bearer)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Pinata request failed");
                transport_error(e, self.timeout)
            })?;

        let id = Self::read_hash(response).await?;
        info!(content_id = %id, "File pinned");
        Ok(id)
    }

    #[instrument(level = "info", skip(self, document), fields(provider = "pinata"))]
    async fn upload_json(&self, document: &Value, name: &str) -> Result<String, StoreError> {
        let bearer = self.authorization()?;
        let body = json!({
            "pinataContent": document,
            "pinataMetadata": { "name": name },
            "pinataOptions": { "cidVersion": CID_VERSION },
        });

        let response = self
            .client
            .post(self.endpoint("/pinning/pinJSONToIPFS")?)
            .header(reqwest::header::AUTHORIZATION, bearer)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Pinata request failed");
                transport_error(e, self.timeout)
            })?;

        let id = Self::read_hash(response).await?;
        info!(content_id = %id, "Metadata pinned");
        Ok(id)
    }

    fn gateway(&self) -> Option<&str> {
        Some(PINATA_GATEWAY)
    }

    fn provider(&self) -> StoreProvider {
        StoreProvider::Pinata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(auth: Option<&str>) -> StoreConfig {
        StoreConfig {
            api_url: Some("https://api.pinata.cloud".into()),
            auth: auth.map(String::from),
            ..StoreConfig::default()
        }
    }

    #[tokio::test]
    async fn test_uploads_fail_without_bearer_auth() {
        for auth in [Some("user:secret"), None] {
            let store = PinataStore::new(&config(auth)).unwrap();
            let err = store.upload(b"x", "x.png").await.unwrap_err();
            assert!(matches!(&err, StoreError::Upload(m) if m.contains("IPFS_AUTH=Bearer")));
            let err = store.upload_json(&json!({}), "m.json").await.unwrap_err();
            assert!(matches!(err, StoreError::Upload(_)));
        }
    }

    #[test]
    fn test_endpoints_replace_configured_path() {
        let mut cfg = config(Some("Bearer jwt"));
        cfg.api_url = Some("https://api.pinata.cloud/data/".into());
        let store = PinataStore::new(&cfg).unwrap();
        assert_eq!(
            store.endpoint("/pinning/pinJSONToIPFS").unwrap().as_str(),
            "https://api.pinata.cloud/pinning/pinJSONToIPFS"
        );
    }

    #[test]
    fn test_pin_response_parsing() {
        let parsed: PinResponse = serde_json::from_str(
            r#"{"IpfsHash":"QmYwAPJzv5CZsnA","PinSize":7,"Timestamp":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(parsed.ipfs_hash.as_deref(), Some("QmYwAPJzv5CZsnA"));
    }

    #[test]
    fn test_debug_hides_token() {
        let store = PinataStore::new(&config(Some("Bearer secret-jwt"))).unwrap();
        assert!(!format!("{store:?}").contains("secret-jwt"));
    }
}
