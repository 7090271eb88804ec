//! HTTP client for the ledger registry (anchor submission and lookup).

use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument, warn};

use super::http_client::{build_client, check_status, read_json, ServiceConfig};
use super::LedgerAnchorService;
use crate::anchor::{
    AnchorReceipt, AnchorReceiptResponse, AnchorRequest, LedgerLookup, LedgerLookupResponse,
};
use crate::claim::MediaId;
use crate::error::{OwnmarkError, Result};
use crate::hashing::Digest;

const ANCHOR_PATH: &str = "registry/v2/anchor";
const LOOKUP_PATH: &str = "registry/v2/verify";
const ARTIFACT_LOOKUP_PATH: &str = "registry/verify";

/// Registry service that submits anchors to the ledger on our behalf.
pub struct HttpLedgerClient {
    client: Client,
    config: ServiceConfig,
}

impl HttpLedgerClient {
    pub fn new() -> Result<Self> {
        Self::with_config(ServiceConfig::default())
    }

    #[instrument(level = "debug", skip_all, fields(api_base = %config.api_base))]
    pub fn with_config(config: ServiceConfig) -> Result<Self> {
        let client = build_client(config.timeout)?;
        debug!("Ledger client created");
        Ok(Self { client, config })
    }
}

/// The registry answers 409 when the media id already has an anchor.
fn already_registered(media_id: &MediaId, detail: &str) -> OwnmarkError {
    OwnmarkError::AlreadyRegistered(format!("media id {media_id} ({})", detail.trim()))
}

#[async_trait]
impl LedgerAnchorService for HttpLedgerClient {
    #[instrument(level = "info", skip_all, fields(media_id = %request.media_id))]
    async fn anchor(&self, request: &AnchorRequest) -> Result<AnchorReceipt> {
        let start = Instant::now();

        let response = self
            .client
            .post(self.config.endpoint(ANCHOR_PATH))
            .json(request)
            .send()
            .await?;
        if response.status() == StatusCode::CONFLICT {
            let detail = response.text().await.unwrap_or_default();
            warn!("Media id already anchored");
            return Err(already_registered(&request.media_id, &detail));
        }
        let response = check_status(response, "anchor service", start).await?;

        let raw: AnchorReceiptResponse = read_json(response, "anchor service").await?;
        let receipt = AnchorReceipt::try_from(raw)?;

        info!(
            tx_hash = %receipt.tx_hash,
            block_number = ?receipt.block_number,
            latency_ms = start.elapsed().as_millis() as u64,
            "Anchor submitted"
        );
        Ok(receipt)
    }

    #[instrument(level = "debug", skip_all, fields(media_id = %media_id))]
    async fn lookup(&self, media_id: &MediaId) -> Result<LedgerLookup> {
        let start = Instant::now();

        let response = self
            .client
            .get(self.config.endpoint(LOOKUP_PATH))
            .query(&[("media_id", media_id.as_str())])
            .send()
            .await?;
        let response = check_status(response, "ledger lookup", start).await?;
        let raw: LedgerLookupResponse = read_json(response, "ledger lookup").await?;

        let lookup = LedgerLookup::from(raw);
        debug!(exists = lookup.exists, "Ledger lookup completed");
        Ok(lookup)
    }

    #[instrument(level = "debug", skip_all, fields(artifact = %artifact))]
    async fn lookup_artifact(&self, artifact: &Digest) -> Result<LedgerLookup> {
        let start = Instant::now();

        let response = self
            .client
            .get(self.config.endpoint(ARTIFACT_LOOKUP_PATH))
            .query(&[("file_sha256", artifact.as_str())])
            .send()
            .await?;
        let response = check_status(response, "ledger lookup", start).await?;
        let raw: LedgerLookupResponse = read_json(response, "ledger lookup").await?;

        let lookup = LedgerLookup::for_artifact(raw, artifact);
        debug!(exists = lookup.exists, "Artifact lookup completed");
        Ok(lookup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::normalize_media_id;

    #[test]
    fn test_create_client() {
        assert!(HttpLedgerClient::new().is_ok());
    }

    #[test]
    fn test_already_registered_names_media_id() {
        let media_id = normalize_media_id(&"ab".repeat(32)).unwrap();
        let err = already_registered(&media_id, " duplicate\n");
        assert!(matches!(err, OwnmarkError::AlreadyRegistered(_)));
        assert!(err.to_string().contains(&"ab".repeat(32)));
        assert!(err.to_string().ends_with("(duplicate)"));
    }

    // Run with: cargo test -p ownmark-core test_lookup_real_service -- --ignored
    #[tokio::test]
    #[ignore = "requires a running registry service at OWNMARK_API_BASE"]
    async fn test_lookup_real_service() {
        let client = HttpLedgerClient::new().unwrap();
        let media_id = normalize_media_id(&"00".repeat(32)).unwrap();
        let lookup = client.lookup(&media_id).await.unwrap();
        println!("lookup: {lookup:?}");
    }
}
