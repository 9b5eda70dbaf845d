//! Off-chain metadata documents and the upload fallback chain.
//!
//! A token's URI must exist before the mint is created. Providers are tried in
//! order: the user's document, then a fixed default document, then a content
//! identifier taken from configuration. The first one that produces an
//! identifier wins.

use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::{Deserialize, Serialize};
use shared::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const PINATA_PIN_FILE_URL: &str = "https://api.pinata.cloud/pinning/pinFileToIPFS";

pub const DEFAULT_TOKEN_NAME: &str = "Default Token";
pub const DEFAULT_TOKEN_SYMBOL: &str = "DFLT";
pub const DEFAULT_TOKEN_DESCRIPTION: &str = "This is a default token created when metadata upload fails";
/// Used when the user leaves the image empty
pub const PLACEHOLDER_IMAGE: &str = "https://placehold.co/600x400?text=Default+Token";
/// Image of the fallback document
pub const DEFAULT_DOCUMENT_IMAGE: &str = "https://placehold.co/400x400/png/FFFFFF/000000?text=Default+Token";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFile {
    pub uri: String,
    #[serde(rename = "type")]
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataProperties {
    pub files: Vec<MetadataFile>,
    pub category: String,
}

/// JSON document wallets read through the mint's metadata URI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataDocument {
    pub name: String,
    pub symbol: String,
    pub description: String,
    pub image: String,
    pub external_url: String,
    pub attributes: Vec<serde_json::Value>,
    pub properties: MetadataProperties,
}

impl MetadataDocument {
    /// Empty fields fall back to the default token's values
    pub fn new(name: &str, symbol: &str, description: &str, image: &str) -> Self {
        let or_default = |value: &str, default: &str| {
            if value.trim().is_empty() {
                default.to_string()
            } else {
                value.to_string()
            }
        };

        let image = normalize_image_url(&or_default(image, PLACEHOLDER_IMAGE));

        Self {
            name: or_default(name, DEFAULT_TOKEN_NAME),
            symbol: or_default(symbol, DEFAULT_TOKEN_SYMBOL),
            description: or_default(description, DEFAULT_TOKEN_DESCRIPTION),
            image: image.clone(),
            external_url: String::new(),
            attributes: Vec::new(),
            properties: MetadataProperties {
                files: vec![MetadataFile {
                    uri: image,
                    mime_type: "image/png".to_string(),
                }],
                category: "image".to_string(),
            },
        }
    }

    /// Document uploaded when the user's own document could not be
    pub fn fallback() -> Self {
        Self::new(
            DEFAULT_TOKEN_NAME,
            DEFAULT_TOKEN_SYMBOL,
            DEFAULT_TOKEN_DESCRIPTION,
            DEFAULT_DOCUMENT_IMAGE,
        )
    }

    pub fn to_blob(&self) -> Result<MetadataBlob> {
        let bytes = serde_json::to_vec(self)
            .map_err(|e| Error::Internal(format!("Failed to serialize metadata: {}", e)))?;

        Ok(MetadataBlob {
            file_name: "metadata.json".to_string(),
            content_type: "application/json".to_string(),
            bytes,
        })
    }
}

/// Robohash images need an explicit extension and size to render in wallets
pub fn normalize_image_url(image: &str) -> String {
    let mut url = image.to_string();
    if !url.contains("robohash.org") {
        return url;
    }

    if ![".png", ".jpg", ".jpeg"].iter().any(|ext| url.ends_with(ext)) {
        url.push_str(".png");
    }

    if !url.contains("size=") {
        let separator = if url.contains('?') { '&' } else { '?' };
        url.push(separator);
        url.push_str("size=400x400");
    }

    url
}

/// Retrieval URI for a content identifier
pub fn metadata_uri(gateway: &str, cid: &str) -> String {
    format!("https://{}/ipfs/{}", gateway.trim_end_matches('/'), cid)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataBlob {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Storage collaborator that pins a file and returns its content identifier
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn upload(&self, blob: &MetadataBlob) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct PinFileResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

/// Pinata `pinFileToIPFS` client
pub struct PinataStore {
    client: Client,
    jwt: Option<String>,
    endpoint: String,
}

impl PinataStore {
    pub fn new(jwt: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            jwt,
            endpoint: PINATA_PIN_FILE_URL.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl MetadataStore for PinataStore {
    async fn upload(&self, blob: &MetadataBlob) -> Result<String> {
        let jwt = self
            .jwt
            .as_deref()
            .ok_or_else(|| Error::MetadataUploadFailed("PINATA_JWT is not configured".to_string()))?;

        let part = multipart::Part::bytes(blob.bytes.clone())
            .file_name(blob.file_name.clone())
            .mime_str(&blob.content_type)
            .map_err(|e| Error::MetadataUploadFailed(format!("Invalid content type: {}", e)))?;
        let form = multipart::Form::new().part("file", part);

        debug!("Uploading {} ({} bytes) to Pinata", blob.file_name, blob.bytes.len());
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(jwt)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::MetadataUploadFailed(format!("Pinata request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::MetadataUploadFailed(format!(
                "Pinata returned {}: {}",
                status, body
            )));
        }

        let pinned: PinFileResponse = response
            .json()
            .await
            .map_err(|e| Error::MetadataUploadFailed(format!("Invalid Pinata response: {}", e)))?;

        info!("Pinned {} as {}", blob.file_name, pinned.ipfs_hash);
        Ok(pinned.ipfs_hash)
    }
}

/// Which provider produced the identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataTier {
    Primary,
    DefaultDocument,
    EnvironmentCid,
}

#[async_trait]
pub trait CidProvider: Send + Sync {
    fn tier(&self) -> MetadataTier;

    async fn provide(&self) -> Result<String>;
}

/// Uploads a document through a `MetadataStore`
pub struct UploadProvider {
    tier: MetadataTier,
    store: Arc<dyn MetadataStore>,
    document: MetadataDocument,
}

impl UploadProvider {
    pub fn new(tier: MetadataTier, store: Arc<dyn MetadataStore>, document: MetadataDocument) -> Self {
        Self { tier, store, document }
    }
}

#[async_trait]
impl CidProvider for UploadProvider {
    fn tier(&self) -> MetadataTier {
        self.tier
    }

    async fn provide(&self) -> Result<String> {
        let blob = self.document.to_blob()?;
        self.store.upload(&blob).await
    }
}

/// Hands out a preconfigured identifier
pub struct FixedCidProvider {
    cid: Option<String>,
}

impl FixedCidProvider {
    pub fn new(cid: Option<String>) -> Self {
        Self { cid }
    }
}

#[async_trait]
impl CidProvider for FixedCidProvider {
    fn tier(&self) -> MetadataTier {
        MetadataTier::EnvironmentCid
    }

    async fn provide(&self) -> Result<String> {
        self.cid
            .clone()
            .filter(|cid| !cid.trim().is_empty())
            .ok_or_else(|| Error::MetadataUploadFailed("DEFAULT_METADATA_HASH is not configured".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMetadata {
    pub cid: String,
    pub tier: MetadataTier,
}

pub struct MetadataFallbackChain {
    providers: Vec<Box<dyn CidProvider>>,
}

impl MetadataFallbackChain {
    pub fn new(providers: Vec<Box<dyn CidProvider>>) -> Self {
        Self { providers }
    }

    /// User document, then the default document, then the configured identifier
    pub fn standard(
        store: Arc<dyn MetadataStore>,
        document: MetadataDocument,
        environment_cid: Option<String>,
    ) -> Self {
        Self::new(vec![
            Box::new(UploadProvider::new(MetadataTier::Primary, store.clone(), document)),
            Box::new(UploadProvider::new(
                MetadataTier::DefaultDocument,
                store,
                MetadataDocument::fallback(),
            )),
            Box::new(FixedCidProvider::new(environment_cid)),
        ])
    }

    pub async fn resolve(&self) -> Result<ResolvedMetadata> {
        let mut failures = Vec::new();

        for provider in &self.providers {
            match provider.provide().await {
                Ok(cid) => {
                    if provider.tier() != MetadataTier::Primary {
                        warn!("Using {:?} metadata after earlier failures", provider.tier());
                    }
                    return Ok(ResolvedMetadata {
                        cid,
                        tier: provider.tier(),
                    });
                }
                Err(e) => {
                    warn!("Metadata provider {:?} failed: {}", provider.tier(), e);
                    failures.push(format!("{:?}: {}", provider.tier(), e));
                }
            }
        }

        Err(Error::MetadataUploadFailed(failures.join("; ")))
    }
}
