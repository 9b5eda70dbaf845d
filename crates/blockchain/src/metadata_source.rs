use async_trait::async_trait;
use reqwest::Client;
use shared::{Error, Result};
use std::time::Duration;
use tracing::debug;

use crate::types::OffChainMetadata;

/// Resolves a metadata URI to its JSON document
#[async_trait]
pub trait OffChainMetadataSource: Send + Sync {
    async fn fetch(&self, uri: &str) -> Result<OffChainMetadata>;
}

pub struct HttpMetadataSource {
    client: Client,
}

impl HttpMetadataSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl OffChainMetadataSource for HttpMetadataSource {
    async fn fetch(&self, uri: &str) -> Result<OffChainMetadata> {
        debug!("Fetching off-chain metadata from {}", uri);

        let response = self
            .client
            .get(uri)
            .send()
            .await
            .map_err(|e| Error::NetworkQueryFailed(format!("GET {} failed: {}", uri, e)))?;

        if !response.status().is_success() {
            return Err(Error::NetworkQueryFailed(format!(
                "GET {} returned {}",
                uri,
                response.status()
            )));
        }

        response
            .json::<OffChainMetadata>()
            .await
            .map_err(|e| Error::NetworkQueryFailed(format!("Invalid metadata JSON at {}: {}", uri, e)))
    }
}
