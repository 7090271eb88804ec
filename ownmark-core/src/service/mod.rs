//! Clients for the external services this crate talks to.
//!
//! - **Embedding service** - writes a claim into media.
//! - **Extraction service** - reads the watermark payload out of media.
//! - **Ledger anchor service** - submits anchors and looks them up.
//! - **Ledger status source** - reports receipt status for a transaction.
//!
//! Each boundary is a trait so flows can be exercised against the mocks in
//! this module, the same way seals are built against a mock entropy source.
//! Responses are deserialized into optional-field wire structs and
//! validated into domain types once, here.

mod embedding;
mod explorer;
mod extraction;
mod http_client;
mod ledger;
mod mock;

pub use embedding::HttpEmbeddingClient;
pub use explorer::{ExplorerConfig, ExplorerStatusClient};
pub use extraction::HttpExtractionClient;
pub use http_client::{is_transient_status, ServiceConfig};
pub use ledger::HttpLedgerClient;
pub use mock::{MockEmbedder, MockExtractor, MockLedgerStatus, MockReply};

use async_trait::async_trait;

use crate::anchor::{AnchorReceipt, AnchorRequest, LedgerLookup, ReceiptStatus, TxHash};
use crate::claim::{Claim, MediaId};
use crate::embed::{EmbedRequest, EmbeddedMedia};
use crate::error::Result;
use crate::hashing::Digest;
use crate::params::{ExtractionParams, MediaKind};
use crate::reconcile::ExtractedPayload;

/// Watermark embedding over a request/response boundary.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Embed `request.claim` into `media` and return the watermarked bytes
    /// with the parameters the service reported.
    async fn embed(&self, media: &[u8], request: &EmbedRequest) -> Result<EmbeddedMedia>;
}

/// Watermark extraction over a request/response boundary.
#[async_trait]
pub trait ExtractionService: Send + Sync {
    /// Extract the payload from `media`, checking it against `check_text`.
    ///
    /// `check_text` is sent byte-for-byte; parameters are passed through.
    async fn extract(
        &self,
        media: &[u8],
        kind: MediaKind,
        check_text: &Claim,
        params: &ExtractionParams,
    ) -> Result<ExtractedPayload>;
}

/// Anchor submission and lookup.
#[async_trait]
pub trait LedgerAnchorService: Send + Sync {
    /// Submit an anchor. Never retried here.
    async fn anchor(&self, request: &AnchorRequest) -> Result<AnchorReceipt>;

    /// What the ledger holds for `media_id`.
    async fn lookup(&self, media_id: &MediaId) -> Result<LedgerLookup>;

    /// What the ledger holds for the exact file with SHA-256 `artifact`.
    ///
    /// Only finds the bytes that were anchored; re-encoded copies need
    /// [`lookup`](Self::lookup) with the media id read from the watermark.
    async fn lookup_artifact(&self, artifact: &Digest) -> Result<LedgerLookup>;
}

/// Source of receipt status for submitted transactions.
#[async_trait]
pub trait LedgerStatusSource: Send + Sync {
    /// Query the receipt status once.
    ///
    /// `Err` means the query itself failed; it says nothing about the
    /// transaction.
    async fn receipt_status(&self, tx_hash: &TxHash) -> Result<ReceiptStatus>;

    /// Short identifier used in logs.
    fn source_name(&self) -> &'static str;
}
