//! Ownmark Core - ownership claims for watermarked media
//!
//! This crate turns an owner identity into the claim text embedded in media,
//! reconciles what an extraction service reads back against a claim, and
//! follows ledger anchors of the media until they are final.
//!
//! # Features
//!
//! - SHA-256 owner digests with email normalization
//! - Claim codec: `owner:<hex64>[|media:<hex64>]`
//! - Embedding requests and the parameters reported back by the embedder
//! - Total, pure reconciliation of extracted payloads into a [`Verdict`]
//! - Extraction presets tuned for re-encoding platforms
//! - Anchor status tracking with cancellation (requires `network`)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ownmark_core::{
//!     compose_check_text, verify_ownership, AnchorTracker, ExplorerStatusClient,
//!     HttpExtractionClient, MediaKind, Preset, TrackerConfig,
//! };
//!
//! # async fn example() -> ownmark_core::Result<()> {
//! let claim = compose_check_text("user@example.com", None);
//! let params = Preset::Facebook.params(MediaKind::Image);
//!
//! let extractor = HttpExtractionClient::new()?;
//! let media = std::fs::read("photo.png")?;
//! let report = verify_ownership(&extractor, &media, MediaKind::Image, &claim, &params).await?;
//! println!("verdict: {:?}", report.verdict);
//!
//! let tracker = AnchorTracker::new(Arc::new(ExplorerStatusClient::new()?), TrackerConfig::default());
//! let mut handle = tracker.start(
//!     "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060",
//!     None,
//! )?;
//! let record = handle.wait_terminal().await;
//! println!("anchor {}", record.status);
//! # Ok(())
//! # }
//! ```

pub mod anchor;
pub mod claim;
pub mod embed;
pub mod error;
pub mod hashing;
pub mod params;
pub mod reconcile;

#[cfg(feature = "network")]
pub mod service;
#[cfg(feature = "network")]
pub mod verify;

// Re-export main types for convenience
pub use anchor::{
    AnchorReceipt, AnchorRecord, AnchorRequest, AnchorStatus, LedgerLookup, ReceiptStatus, TxHash,
};
pub use claim::{
    build_claim, compose_check_text, normalize_media_id, resolve_claim_from_free_text, Claim,
    MediaId,
};
pub use embed::{EmbedOutcome, EmbedReceipt, EmbedRequest, EmbeddedMedia, EmbeddedParams};
pub use error::{OwnmarkError, Result};
pub use hashing::{digest_of, digest_of_bytes, digest_of_file, normalize_email, Digest};
pub use params::{ExtractionParams, MediaKind, Preset};
pub use reconcile::{
    decode, reconcile, reconcile_detailed, DecodedPayload, ExtractedPayload, Reconciliation,
    Verdict,
};

// Network-dependent exports
#[cfg(feature = "network")]
pub use anchor::{AnchorEvent, AnchorHandle, AnchorTracker, TrackerConfig};
#[cfg(feature = "network")]
pub use embed::embed_ownership;
#[cfg(feature = "network")]
pub use service::{
    EmbeddingService, ExplorerConfig, ExplorerStatusClient, ExtractionService,
    HttpEmbeddingClient, HttpExtractionClient, HttpLedgerClient, LedgerAnchorService,
    LedgerStatusSource, MockEmbedder, MockExtractor, MockLedgerStatus, ServiceConfig,
};
#[cfg(feature = "network")]
pub use verify::{verify_ownership, VerificationReport};

#[cfg(test)]
mod tests {
    use super::*;

    /// Claim built from an email decodes back to the same owner.
    #[test]
    fn test_claim_reconcile_workflow() {
        let owner = digest_of(&normalize_email("  User@Example.com "));
        let media = MediaId::from(digest_of_bytes(b"Hello World"));
        let claim = build_claim(&owner, Some(&media));

        let hex = format!("{}{}", owner.as_str(), media.as_str());
        let payload = ExtractedPayload::from_recovered_hex(hex, true);
        let result = reconcile_detailed(&claim, &payload);

        assert_eq!(result.verdict, Verdict::Verified);
        assert_eq!(result.decoded.owner_digest.as_ref(), Some(&owner));
        assert_eq!(result.decoded.media_id.as_ref(), Some(&media));
    }

    #[test]
    fn test_different_owner_rejected() {
        let claim = build_claim(&digest_of("a@example.com"), None);
        let payload =
            ExtractedPayload::from_recovered_hex(digest_of("b@example.com").as_str(), true);
        assert_eq!(reconcile(&claim, &payload), Verdict::NotVerified);
    }
}
