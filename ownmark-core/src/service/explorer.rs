//! Block explorer receipt status (Etherscan-family `gettxreceiptstatus`).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use super::http_client::{build_client, check_status, env_timeout};
use super::LedgerStatusSource;
use crate::anchor::{ExplorerReceiptResponse, ReceiptStatus, TxHash};
use crate::error::Result;

/// Default explorer API endpoint (Polygon Amoy testnet).
const DEFAULT_API_URL: &str = "https://api-amoy.polygonscan.com/api";

/// Default explorer web base used for transaction links.
const DEFAULT_EXPLORER_BASE: &str = "https://amoy.polygonscan.com";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the explorer status client.
#[derive(Clone)]
pub struct ExplorerConfig {
    /// API endpoint URL (without query parameters).
    pub api_url: String,
    /// Optional API key; unauthenticated calls are heavily rate limited.
    pub api_key: Option<String>,
    /// Web base for `/tx/<hash>` links.
    pub explorer_base: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for ExplorerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExplorerConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("explorer_base", &self.explorer_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            api_url: std::env::var("OWNMARK_EXPLORER_API")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            api_key: std::env::var("OWNMARK_EXPLORER_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            explorer_base: std::env::var("OWNMARK_EXPLORER_BASE")
                .unwrap_or_else(|_| DEFAULT_EXPLORER_BASE.to_string()),
            timeout: env_timeout().unwrap_or(DEFAULT_TIMEOUT),
        }
    }
}

/// Ledger status source backed by a block explorer API.
pub struct ExplorerStatusClient {
    client: Client,
    config: ExplorerConfig,
}

impl ExplorerStatusClient {
    pub fn new() -> Result<Self> {
        Self::with_config(ExplorerConfig::default())
    }

    #[instrument(level = "debug", skip_all, fields(api_url = %config.api_url))]
    pub fn with_config(config: ExplorerConfig) -> Result<Self> {
        let client = build_client(config.timeout)?;
        debug!("Explorer status client created");
        Ok(Self { client, config })
    }

    fn query<'a>(&'a self, tx_hash: &'a TxHash) -> Vec<(&'static str, &'a str)> {
        let mut query = vec![
            ("module", "transaction"),
            ("action", "gettxreceiptstatus"),
            ("txhash", tx_hash.as_str()),
        ];
        if let Some(key) = &self.config.api_key {
            query.push(("apikey", key.as_str()));
        }
        query
    }
}

#[async_trait]
impl LedgerStatusSource for ExplorerStatusClient {
    #[instrument(level = "debug", skip_all, fields(tx_hash = %tx_hash))]
    async fn receipt_status(&self, tx_hash: &TxHash) -> Result<ReceiptStatus> {
        let start = Instant::now();

        let response = self
            .client
            .get(&self.config.api_url)
            .query(&self.query(tx_hash))
            .send()
            .await?;
        let response = check_status(response, "explorer", start).await?;

        // An unreadable body is an answer we do not understand, not a
        // transport failure.
        let status = match response.json::<ExplorerReceiptResponse>().await {
            Ok(body) => body.receipt_status(),
            Err(e) => {
                debug!(error = %e, "Unparseable explorer response, treating as pending");
                ReceiptStatus::Unrecognized
            }
        };

        debug!(
            status = ?status,
            latency_ms = start.elapsed().as_millis() as u64,
            "Receipt status fetched"
        );
        Ok(status)
    }

    fn source_name(&self) -> &'static str {
        "explorer"
    }
}
